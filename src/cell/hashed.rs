use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::{assert_open, merge, BackPointer, ChartCell, Merge};
use crate::rule::Rule;
use crate::semiring::ParseType;
use crate::symbol::Symbol;

/// A cell that maps symbols to entries, for grammars with so many nonterminals that a dense
/// array per cell would waste memory.
#[derive(Clone, Debug)]
pub struct HashedCell {
    parse_type: ParseType,
    entries: HashMap<Symbol, (f64, BackPointer)>,
    /// Filled in sorted order when the cell is closed.
    present: Vec<Symbol>,
    closed: bool,
}

impl HashedCell {
    pub fn new(parse_type: ParseType) -> Self {
        HashedCell {
            parse_type,
            entries: HashMap::new(),
            present: vec![],
            closed: false,
        }
    }
}

impl ChartCell for HashedCell {
    fn update_cell(&mut self, mid: usize, rule: &Rule, score: f64) {
        assert_open(self.closed);
        let parse_type = self.parse_type;
        let offered = (score, BackPointer::for_update(parse_type, rule, mid));
        match self.entries.entry(rule.parent()) {
            Entry::Vacant(vacant) => {
                vacant.insert(offered);
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                match merge(parse_type, entry.0, score) {
                    Merge::Replace => *entry = offered,
                    Merge::Accumulate(total) => entry.0 = total,
                    Merge::Keep => {}
                }
            }
        }
    }

    #[inline]
    fn score(&self, sym: Symbol) -> f64 {
        self.entries
            .get(&sym)
            .map_or(self.parse_type.zero(), |&(score, _)| score)
    }

    #[inline]
    fn contains(&self, sym: Symbol) -> bool {
        self.entries.contains_key(&sym)
    }

    fn back_pointer(&self, sym: Symbol) -> Option<BackPointer> {
        self.entries.get(&sym).map(|&(_, back_pointer)| back_pointer)
    }

    fn symbols_present(&self) -> &[Symbol] {
        debug_assert!(self.closed, "symbol list of an open chart cell");
        &self.present[..]
    }

    fn close(&mut self) {
        self.closed = true;
        self.present.clear();
        self.present.extend(self.entries.keys().copied());
        self.present.sort_unstable();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.present.clear();
        self.closed = false;
    }
}

/// A hashed cell that keeps scores and back pointers in separate maps. Inside charts never fill
/// the back pointer map.
#[derive(Clone, Debug)]
pub struct DoubleHashedCell {
    parse_type: ParseType,
    scores: HashMap<Symbol, f64>,
    back_pointers: HashMap<Symbol, BackPointer>,
    present: Vec<Symbol>,
    closed: bool,
}

impl DoubleHashedCell {
    pub fn new(parse_type: ParseType) -> Self {
        DoubleHashedCell {
            parse_type,
            scores: HashMap::new(),
            back_pointers: HashMap::new(),
            present: vec![],
            closed: false,
        }
    }

    fn set_back_pointer(&mut self, sym: Symbol, rule: &Rule, mid: usize) {
        if self.parse_type == ParseType::Viterbi {
            self.back_pointers
                .insert(sym, BackPointer::for_update(self.parse_type, rule, mid));
        }
    }
}

impl ChartCell for DoubleHashedCell {
    fn update_cell(&mut self, mid: usize, rule: &Rule, score: f64) {
        assert_open(self.closed);
        let parent = rule.parent();
        let current = match self.scores.get(&parent) {
            Some(&current) => current,
            None => {
                self.scores.insert(parent, score);
                self.set_back_pointer(parent, rule, mid);
                return;
            }
        };
        match merge(self.parse_type, current, score) {
            Merge::Replace => {
                self.scores.insert(parent, score);
                self.set_back_pointer(parent, rule, mid);
            }
            Merge::Accumulate(total) => {
                self.scores.insert(parent, total);
            }
            Merge::Keep => {}
        }
    }

    #[inline]
    fn score(&self, sym: Symbol) -> f64 {
        self.scores
            .get(&sym)
            .copied()
            .unwrap_or(self.parse_type.zero())
    }

    #[inline]
    fn contains(&self, sym: Symbol) -> bool {
        self.scores.contains_key(&sym)
    }

    fn back_pointer(&self, sym: Symbol) -> Option<BackPointer> {
        if !self.contains(sym) {
            return None;
        }
        Some(
            self.back_pointers
                .get(&sym)
                .copied()
                .unwrap_or(BackPointer::Untracked),
        )
    }

    fn symbols_present(&self) -> &[Symbol] {
        debug_assert!(self.closed, "symbol list of an open chart cell");
        &self.present[..]
    }

    fn close(&mut self) {
        self.closed = true;
        self.present.clear();
        self.present.extend(self.scores.keys().copied());
        self.present.sort_unstable();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn reset(&mut self) {
        self.scores.clear();
        self.back_pointers.clear();
        self.present.clear();
        self.closed = false;
    }
}
