use std::marker::PhantomData;

/// Like `Vec<T>`, but can only be indexed by a specific type.
pub struct KeyVec<K, T> {
    _phantom: PhantomData<K>,
    inner: Vec<T>,
}

impl<K, T> Default for KeyVec<K, T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
            inner: Vec::new(),
        }
    }
}

impl<K, T: std::fmt::Debug> std::fmt::Debug for KeyVec<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<K, T: Clone> Clone for KeyVec<K, T> {
    fn clone(&self) -> Self {
        Self {
            _phantom: PhantomData,
            inner: self.inner.clone(),
        }
    }
}

impl<K: KeyOps, T> KeyVec<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, returning the key under which it can be retrieved.
    pub fn push(&mut self, value: T) -> K {
        let key = K::from_index(self.inner.len());
        self.inner.push(value);
        key
    }

    pub fn get(&self, key: K) -> Option<&T> {
        self.inner.get(key.index())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + ExactSizeIterator {
        (0..self.inner.len()).map(K::from_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + ExactSizeIterator {
        self.inner
            .iter()
            .enumerate()
            .map(|(index, value)| (K::from_index(index), value))
    }
}

impl<K: KeyOps, T> std::ops::Index<K> for KeyVec<K, T> {
    type Output = T;

    fn index(&self, index: K) -> &Self::Output {
        &self.inner[index.index()]
    }
}

impl<K: KeyOps, T> std::ops::IndexMut<K> for KeyVec<K, T> {
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.inner[index.index()]
    }
}

pub trait KeyOps: Copy {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

/// A typed index into a `KeyVec<Key<T>, _>`.
pub struct Key<T> {
    raw: u32,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> KeyOps for Key<T> {
    fn index(self) -> usize {
        self.raw as usize
    }

    fn from_index(index: usize) -> Self {
        assert!(index < u32::MAX as usize, "exceeded maximum number of keys");
        Self {
            raw: index as u32,
            _phantom: PhantomData,
        }
    }
}

// implemented manually so that `T` is not required to implement these traits
impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Key<T> {}

impl<T> PartialOrd for Key<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Key<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> std::hash::Hash for Key<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

impl<T> std::fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn push_returns_sequential_keys() {
        let mut list = KeyVec::<Key<&str>, &str>::new();
        let a = list.push("a");
        let b = list.push("b");
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(list[b], "b");
        assert_eq!(list.keys().collect::<Vec<_>>(), [a, b]);
    }
}
