//! Alphabet

use std::collections::HashMap;

use crate::symbol::Symbol;

/// Interns symbol names. IDs are handed out consecutively from zero.
#[derive(Clone, Debug, Default)]
pub struct Alphabet {
    names: Vec<String>,
    index: HashMap<String, Symbol>,
}

impl Alphabet {
    /// Creates an empty alphabet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an interned symbol, or inserts a new entry if it does not exist.
    pub fn intern<T>(&mut self, name: T) -> Symbol
    where
        T: AsRef<str>,
    {
        if let Some(&sym) = self.index.get(name.as_ref()) {
            return sym;
        }
        let sym = Symbol::from(self.names.len());
        self.names.push(name.as_ref().to_string());
        self.index.insert(name.as_ref().to_string(), sym);
        sym
    }

    /// Generates `N` symbols with the given names.
    pub fn syms<const N: usize>(&mut self, names: [&str; N]) -> [Symbol; N] {
        names.map(|name| self.intern(name))
    }

    /// Looks up a symbol by name.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).copied()
    }

    /// Looks up every token of a sentence.
    pub fn lookup_all<'a, I>(&self, tokens: I) -> Option<Vec<Symbol>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens.into_iter().map(|token| self.lookup(token)).collect()
    }

    /// Returns the name of a symbol.
    pub fn name(&self, sym: Symbol) -> Option<&str> {
        self.names.get(sym.usize()).map(|name| &name[..])
    }

    /// Returns the number of symbols in use.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Checks whether the symbol belongs to this alphabet.
    pub fn contains(&self, sym: Symbol) -> bool {
        sym.usize() < self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut alphabet = Alphabet::new();
        let [the, dog] = alphabet.syms(["the", "dog"]);
        assert_eq!(alphabet.intern("the"), the);
        assert_eq!(alphabet.len(), 2);
        assert_eq!(alphabet.name(dog), Some("dog"));
        assert_eq!(alphabet.lookup("cat"), None);
        assert_eq!(alphabet.lookup_all(["dog", "the"]), Some(vec![dog, the]));
        assert_eq!(alphabet.lookup_all(["dog", "cat"]), None);
    }
}
