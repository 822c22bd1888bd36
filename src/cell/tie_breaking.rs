use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use optional::Optioned;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{assert_open, BackPointer, ChartCell};
use crate::rule::Rule;
use crate::semiring::ParseType;
use crate::symbol::Symbol;

/// Scores closer than this are tied.
pub const TIE_TOLERANCE: f64 = 1e-13;

/// A seeded source of jitter values, shared by every tie-breaking cell of a chart.
///
/// Clones draw from the same stream, so the sequence of draws, and thus the outcome of every
/// tie, depends on the seed and on the order of all parses made with this source.
#[derive(Clone)]
pub struct JitterSource {
    rng: Rc<RefCell<SmallRng>>,
}

impl JitterSource {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self::from_rng(SmallRng::seed_from_u64(seed))
    }

    fn from_rng(rng: SmallRng) -> Self {
        JitterSource {
            rng: Rc::new(RefCell::new(rng)),
        }
    }

    /// Draws a value in `[0, 1)`.
    pub fn draw(&self) -> f64 {
        self.rng.borrow_mut().gen()
    }
}

impl fmt::Debug for JitterSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JitterSource").finish_non_exhaustive()
    }
}

/// A dense Viterbi cell that breaks ties between equally scored derivations at random.
///
/// When an update ties with the incumbent, a jitter value is drawn for each of them and the
/// larger one wins. The incumbent's jitter is drawn the first time it is contested and kept
/// until it loses, so every contested symbol draws at most one jitter for its incumbent.
#[derive(Clone, Debug)]
pub struct TieBreakingCell {
    scores: Vec<Optioned<f64>>,
    back_pointers: Vec<BackPointer>,
    jitter: Vec<Optioned<f64>>,
    present: Vec<Symbol>,
    source: JitterSource,
    closed: bool,
}

impl TieBreakingCell {
    pub fn new(num_nonterminals: usize, source: JitterSource) -> Self {
        TieBreakingCell {
            scores: vec![Optioned::none(); num_nonterminals],
            back_pointers: vec![BackPointer::Untracked; num_nonterminals],
            jitter: vec![Optioned::none(); num_nonterminals],
            present: vec![],
            source,
            closed: false,
        }
    }

    /// Returns the jitter drawn for the incumbent of a symbol, if it was ever contested.
    pub fn jitter(&self, sym: Symbol) -> Option<f64> {
        self.jitter
            .get(sym.usize())
            .filter(|jitter| jitter.is_some())
            .map(|jitter| jitter.unpack())
    }

    fn replace(&mut self, slot: usize, mid: usize, rule: &Rule, score: f64) {
        self.scores[slot] = Optioned::some(score);
        self.back_pointers[slot] = BackPointer::for_update(ParseType::Viterbi, rule, mid);
    }
}

impl ChartCell for TieBreakingCell {
    fn update_cell(&mut self, mid: usize, rule: &Rule, score: f64) {
        assert_open(self.closed);
        let parent = rule.parent();
        let slot = parent.usize();
        let current = self.scores[slot];
        if current.is_none() {
            self.replace(slot, mid, rule, score);
            self.present.push(parent);
            return;
        }
        let best = current.unpack();
        if score > best + TIE_TOLERANCE {
            self.replace(slot, mid, rule, score);
            self.jitter[slot] = Optioned::none();
        } else if (score - best).abs() <= TIE_TOLERANCE {
            let incumbent = if self.jitter[slot].is_some() {
                self.jitter[slot].unpack()
            } else {
                let drawn = self.source.draw();
                self.jitter[slot] = Optioned::some(drawn);
                drawn
            };
            let challenger = self.source.draw();
            if challenger > incumbent {
                self.replace(slot, mid, rule, score);
                self.jitter[slot] = Optioned::some(challenger);
            }
        }
    }

    #[inline]
    fn score(&self, sym: Symbol) -> f64 {
        match self.scores.get(sym.usize()) {
            Some(score) if score.is_some() => score.unpack(),
            _ => ParseType::Viterbi.zero(),
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
        for sym in self.present.drain(..) {
            self.scores[sym.usize()] = Optioned::none();
            self.back_pointers[sym.usize()] = BackPointer::Untracked;
            self.jitter[sym.usize()] = Optioned::none();
        }
        self.closed = false;
    }
}
