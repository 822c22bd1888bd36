use optional::Optioned;

use super::{assert_open, merge, BackPointer, ChartCell, Merge};
use crate::rule::Rule;
use crate::semiring::ParseType;
use crate::symbol::Symbol;

/// A cell with one dense slot per nonterminal.
///
/// Suited to grammars with few nonterminals, where array indexing beats hashing.
#[derive(Clone, Debug)]
pub struct FullCell {
    parse_type: ParseType,
    /// `none` until the symbol receives an update.
    scores: Vec<Optioned<f64>>,
    back_pointers: Vec<BackPointer>,
    /// Symbols in the order of their first update, sorted when the cell is closed.
    present: Vec<Symbol>,
    closed: bool,
}

impl FullCell {
    pub fn new(num_nonterminals: usize, parse_type: ParseType) -> Self {
        FullCell {
            parse_type,
            scores: vec![Optioned::none(); num_nonterminals],
            back_pointers: vec![BackPointer::Untracked; num_nonterminals],
            present: vec![],
            closed: false,
        }
    }
}

impl ChartCell for FullCell {
    fn update_cell(&mut self, mid: usize, rule: &Rule, score: f64) {
        assert_open(self.closed);
        let parent = rule.parent();
        let slot = parent.usize();
        let current = self.scores[slot];
        if current.is_none() {
            self.scores[slot] = Optioned::some(score);
            self.back_pointers[slot] = BackPointer::for_update(self.parse_type, rule, mid);
            self.present.push(parent);
            return;
        }
        match merge(self.parse_type, current.unpack(), score) {
            Merge::Replace => {
                self.scores[slot] = Optioned::some(score);
                self.back_pointers[slot] = BackPointer::for_update(self.parse_type, rule, mid);
            }
            Merge::Accumulate(total) => self.scores[slot] = Optioned::some(total),
            Merge::Keep => {}
        }
    }

    #[inline]
    fn score(&self, sym: Symbol) -> f64 {
        match self.scores.get(sym.usize()) {
            Some(score) if score.is_some() => score.unpack(),
            _ => self.parse_type.zero(),
        }
    }

    #[inline]
    fn contains(&self, sym: Symbol) -> bool {
        self.scores
            .get(sym.usize())
            .map_or(false, |score| score.is_some())
    }

    fn back_pointer(&self, sym: Symbol) -> Option<BackPointer> {
        if self.contains(sym) {
            Some(self.back_pointers[sym.usize()])
        } else {
            None
        }
    }

    fn symbols_present(&self) -> &[Symbol] {
        debug_assert!(self.closed, "symbol list of an open chart cell");
        &self.present[..]
    }

    fn close(&mut self) {
        self.closed = true;
        self.present.sort_unstable();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn reset(&mut self) {
        // Only touched slots need clearing.
        for sym in self.present.drain(..) {
            self.scores[sym.usize()] = Optioned::none();
            self.back_pointers[sym.usize()] = BackPointer::Untracked;
        }
        self.closed = false;
    }
}
