use hashbrown::raw::RawTable;

use fxhash::hash64;

use std::hash::Hash;

/// A hash map which remembers the order in which keys were inserted.
#[derive(Clone)]
pub struct IndexMap<K, V> {
    lookup: RawTable<u32>,
    entries: Vec<(K, V)>,
}

impl<K, V> Default for IndexMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> IndexMap<K, V> {
    pub const fn new() -> Self {
        Self {
            lookup: RawTable::new(),
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)>
    where
        K: Hash + Eq,
    {
        let hash = hash64(&key);

        if let Some(index) = self.find(hash, &key) {
            return Some(std::mem::replace(&mut self.entries[index], (key, value)));
        }

        self.push_entry(hash, key, value);
        None
    }

    /// Get the value for `key`, inserting the result of `make` if it is missing.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V
    where
        K: Hash + Eq,
    {
        let hash = hash64(&key);
        let index = match self.find(hash, &key) {
            Some(index) => index,
            None => self.push_entry(hash, key, make()),
        };
        &mut self.entries[index].1
    }

    fn push_entry(&mut self, hash: u64, key: K, value: V) -> usize
    where
        K: Hash,
    {
        let index = self.entries.len();
        self.entries.push((key, value));
        self.lookup
            .insert(hash, index as u32, Self::hash_fn(&self.entries));
        index
    }

    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: Hash + Eq,
    {
        let hash = hash64(key);
        let index = self.find(hash, key)?;
        Some(&self.entries[index].1)
    }

    pub fn contains_key(&self, key: &K) -> bool
    where
        K: Hash + Eq,
    {
        self.get(key).is_some()
    }

    fn find(&self, hash: u64, key: &K) -> Option<usize>
    where
        K: Eq,
    {
        let index = self.lookup.get(hash, self.eq_fn(key))?;
        Some(*index as usize)
    }

    fn eq_fn<'a>(&'a self, key: &'a K) -> impl Fn(&u32) -> bool + 'a
    where
        K: Eq,
    {
        move |&index| key == &self.entries[index as usize].0
    }

    fn hash_fn(entries: &[(K, V)]) -> impl Fn(&u32) -> u64 + '_
    where
        K: Hash,
    {
        move |&index| hash64(&entries[index as usize].0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'_ K, &'_ V)> + ExactSizeIterator + '_ {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &'_ V> {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl<K, V> std::fmt::Debug for IndexMap<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("b", 1);
        map.insert("a", 2);
        map.insert("b", 3);
        *map.get_or_insert_with("c", || 0) += 4;
        *map.get_or_insert_with("a", || 0) += 10;

        assert_eq!(
            map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
            [("b", 3), ("a", 12), ("c", 4)]
        );
        assert!(map.contains_key(&"c"));
        assert!(!map.contains_key(&"d"));
    }
}
