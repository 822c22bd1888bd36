//! Hooks that restrict which updates reach the chart.
//!
//! A constraint is consulted before every update of a [`FilteredCell`]. Branch-and-bound search
//! uses this to keep a parse within per-span feasibility bounds without touching the grammar
//! or the recurrence.
//!
//! [`FilteredCell`]: crate::cell::FilteredCell

use std::cell::RefCell;
use std::rc::Rc;

use bit_matrix::BitMatrix;

use crate::rule::Rule;
use crate::symbol::Symbol;

/// Decides which updates a constrained chart accepts.
pub trait CellConstraint {
    /// Called once before each sentence is parsed.
    fn set_sentence(&mut self, sentence: &[Symbol]);

    /// Returns whether the derivation of `rule.parent()` over `[start, end)`, split at `mid`,
    /// with the given score may update the chart.
    fn should_update_cell(
        &self,
        start: usize,
        end: usize,
        mid: usize,
        rule: &Rule,
        score: f64,
    ) -> bool;
}

/// A constraint shared by all cells of a chart and by its owner.
pub type SharedConstraint = Rc<RefCell<dyn CellConstraint>>;

/// Wraps a constraint for use by a chart.
pub fn shared<C: CellConstraint + 'static>(constraint: C) -> SharedConstraint {
    Rc::new(RefCell::new(constraint))
}

/// Adapts a stateless predicate.
pub struct FnConstraint<F> {
    predicate: F,
}

impl<F> FnConstraint<F>
where
    F: Fn(usize, usize, usize, &Rule, f64) -> bool,
{
    pub fn new(predicate: F) -> Self {
        FnConstraint { predicate }
    }
}

impl<F> CellConstraint for FnConstraint<F>
where
    F: Fn(usize, usize, usize, &Rule, f64) -> bool,
{
    fn set_sentence(&mut self, _sentence: &[Symbol]) {}

    fn should_update_cell(
        &self,
        start: usize,
        end: usize,
        mid: usize,
        rule: &Rule,
        score: f64,
    ) -> bool {
        (self.predicate)(start, end, mid, rule, score)
    }
}

/// Forbids constituents over a set of spans, e.g. the spans that cross a known bracketing.
///
/// Spans are `(start, end)` pairs of fence-post positions. Lexical and unary updates of a
/// forbidden span are rejected along with binary ones.
#[derive(Clone, Debug)]
pub struct BracketConstraint {
    forbidden: BitMatrix,
    sentence_len: usize,
}

impl BracketConstraint {
    /// Creates a constraint that allows every span of sentences up to `max_len` tokens.
    pub fn new(max_len: usize) -> Self {
        BracketConstraint {
            forbidden: BitMatrix::new(max_len + 1, max_len + 1),
            sentence_len: 0,
        }
    }

    /// Creates a constraint that forbids every span crossing one of `brackets`. Two spans cross
    /// if they overlap and neither contains the other.
    pub fn from_brackets(max_len: usize, brackets: &[(usize, usize)]) -> Self {
        let mut constraint = Self::new(max_len);
        for start in 0..max_len {
            for end in start + 1..=max_len {
                let crosses = brackets.iter().any(|&(b_start, b_end)| {
                    (start < b_start && b_start < end && end < b_end)
                        || (b_start < start && start < b_end && b_end < end)
                });
                if crosses {
                    constraint.forbid(start, end);
                }
            }
        }
        constraint
    }

    /// Forbids the span `[start, end)`.
    pub fn forbid(&mut self, start: usize, end: usize) {
        self.forbidden.set(start, end, true);
    }

    pub fn is_forbidden(&self, start: usize, end: usize) -> bool {
        let (rows, cols) = self.forbidden.size();
        start < rows && end < cols && self.forbidden[(start, end)]
    }

    /// The length of the sentence last announced with `set_sentence`.
    pub fn sentence_len(&self) -> usize {
        self.sentence_len
    }
}

impl CellConstraint for BracketConstraint {
    fn set_sentence(&mut self, sentence: &[Symbol]) {
        self.sentence_len = sentence.len();
        let (rows, _) = self.forbidden.size();
        if sentence.len() + 1 > rows {
            let mut grown = BitMatrix::new(sentence.len() + 1, sentence.len() + 1);
            for start in 0..rows {
                for end in 0..rows {
                    if self.forbidden[(start, end)] {
                        grown.set(start, end, true);
                    }
                }
            }
            self.forbidden = grown;
        }
    }

    fn should_update_cell(
        &self,
        start: usize,
        end: usize,
        _mid: usize,
        _rule: &Rule,
        _score: f64,
    ) -> bool {
        !self.is_forbidden(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_brackets_are_forbidden() {
        // Bracket [1, 3) over 4 tokens.
        let constraint = BracketConstraint::from_brackets(4, &[(1, 3)]);
        assert!(constraint.is_forbidden(0, 2));
        assert!(constraint.is_forbidden(2, 4));
        assert!(!constraint.is_forbidden(1, 3));
        assert!(!constraint.is_forbidden(0, 3));
        assert!(!constraint.is_forbidden(1, 4));
        assert!(!constraint.is_forbidden(0, 4));
        assert!(!constraint.is_forbidden(1, 2));
    }

    #[test]
    fn test_set_sentence_grows_the_matrix() {
        let mut constraint = BracketConstraint::new(2);
        constraint.forbid(0, 2);
        let sentence = vec![Symbol::from(0usize); 5];
        constraint.set_sentence(&sentence);
        assert_eq!(constraint.sentence_len(), 5);
        assert!(constraint.is_forbidden(0, 2));
        assert!(!constraint.is_forbidden(3, 5));
        constraint.forbid(3, 5);
        assert!(constraint.is_forbidden(3, 5));
    }

    #[test]
    fn test_fn_constraint() {
        let rule = Rule::unary(Symbol::from(0usize), Symbol::from(1usize), -1.0);
        let even_mid = FnConstraint::new(|_, _, mid, _: &Rule, _| mid % 2 == 0);
        assert!(even_mid.should_update_cell(0, 4, 2, &rule, -1.0));
        assert!(!even_mid.should_update_cell(0, 4, 3, &rule, -1.0));
    }
}
