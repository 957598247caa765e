use crate::HashMap;

/// An interned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Text {
    id: u32,
}

impl Text {
    /// The blank identifier `_`, which is always interned first.
    pub const BLANK: Text = Text { id: 0 };

    pub fn is_blank(self) -> bool {
        self == Self::BLANK
    }
}

/// Owns the strings behind every `Text` in a file.
#[derive(Debug, Clone)]
pub struct Interner {
    lookup: HashMap<Box<str>, Text>,
    strings: Vec<Box<str>>,
}

impl Default for Interner {
    fn default() -> Self {
        let mut interner = Self {
            lookup: HashMap::default(),
            strings: Vec::new(),
        };
        let blank = interner.intern("_");
        debug_assert_eq!(blank, Text::BLANK);
        interner
    }
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Text {
        if let Some(&existing) = self.lookup.get(text) {
            return existing;
        }

        let id = Text {
            id: self.strings.len() as u32,
        };
        self.strings.push(text.into());
        self.lookup.insert(text.into(), id);
        id
    }

    /// Returns the `Text` for a string if it was ever interned.
    pub fn find(&self, text: &str) -> Option<Text> {
        self.lookup.get(text).copied()
    }

    pub fn get(&self, text: Text) -> &str {
        &self.strings[text.id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn interning_is_stable() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_eq!(interner.intern("foo"), a);
        assert_eq!(interner.get(b), "bar");
        assert_eq!(interner.find("_"), Some(Text::BLANK));
        assert_eq!(interner.find("baz"), None);
    }
}
