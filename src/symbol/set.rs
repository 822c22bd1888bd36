//! Sets of symbols in the form of a bit vector.

use std::iter;

use bit_vec::BitVec;

use crate::symbol::Symbol;

/// A set of symbols in the form of a bit vector.
#[derive(Clone, Debug, Default)]
pub struct SymbolBitSet {
    bit_vec: BitVec,
}

/// An iterator over a symbol set.
pub struct Iter<'a> {
    iter: iter::Enumerate<bit_vec::Iter<'a>>,
}

impl SymbolBitSet {
    /// Constructs a `SymbolBitSet` for an alphabet of `num_syms` symbols.
    pub fn new(num_syms: usize, elem: bool) -> Self {
        SymbolBitSet {
            bit_vec: BitVec::from_elem(num_syms, elem),
        }
    }

    /// Set the entry for a symbol.
    pub fn set(&mut self, sym: Symbol, value: bool) {
        self.bit_vec.set(sym.usize(), value);
    }

    /// Checks whether a given symbol is in this set. Symbols outside the alphabet are never
    /// members.
    pub fn has_sym(&self, sym: Symbol) -> bool {
        self.bit_vec.get(sym.usize()).unwrap_or(false)
    }

    /// Returns the size of the alphabet this set ranges over.
    pub fn len(&self) -> usize {
        self.bit_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bit_vec.is_empty()
    }

    /// Counts the members of this set.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Iterates over symbols in the set.
    pub fn iter(&self) -> Iter {
        Iter {
            iter: self.bit_vec.iter().enumerate(),
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Symbol;
    fn next(&mut self) -> Option<Self::Item> {
        for (id, is_present) in &mut self.iter {
            if is_present {
                return Some(Symbol::from(id));
            }
        }
        None
    }
}

#[test]
fn test_symbol_bit_set() {
    let mut set = SymbolBitSet::new(5, false);
    set.set(Symbol::from(1usize), true);
    set.set(Symbol::from(4usize), true);
    assert!(set.has_sym(Symbol::from(4usize)));
    assert!(!set.has_sym(Symbol::from(2usize)));
    assert!(!set.has_sym(Symbol::from(9usize)));
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![Symbol::from(1usize), Symbol::from(4usize)]);
    assert_eq!(set.count(), 2);
}
