//! Chart cells hold the best or total score of every nonterminal over one span.
//!
//! All variants share the [`ChartCell`] contract. A cell starts out open, receives any number of
//! updates, and is then closed, which freezes it and fixes the list of symbols present. Updating
//! a closed cell is a bug and panics. Reading the symbol list of an open cell is a bug as well,
//! caught by debug assertions.

mod filtered;
mod full;
mod hashed;
mod tie_breaking;

pub use self::filtered::FilteredCell;
pub use self::full::FullCell;
pub use self::hashed::{DoubleHashedCell, HashedCell};
pub use self::tie_breaking::{JitterSource, TieBreakingCell, TIE_TOLERANCE};

use crate::rule::{Rule, RuleId};
use crate::semiring::ParseType;
use crate::symbol::Symbol;

/// Records how an entry of a cell got its score.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BackPointer {
    /// The best derivation applies `rule` at the top. `mid` is the split point of a binary rule,
    /// the token position of a lexical rule, or the span end of a unary rule.
    Derivation { rule: RuleId, mid: usize },
    /// The entry is set, but no single rule accounts for it. Inside scores have such entries.
    Untracked,
}

impl BackPointer {
    pub fn rule(&self) -> Option<RuleId> {
        match *self {
            BackPointer::Derivation { rule, .. } => Some(rule),
            BackPointer::Untracked => None,
        }
    }

    pub fn mid(&self) -> Option<usize> {
        match *self {
            BackPointer::Derivation { mid, .. } => Some(mid),
            BackPointer::Untracked => None,
        }
    }

    fn for_update(parse_type: ParseType, rule: &Rule, mid: usize) -> Self {
        match parse_type {
            ParseType::Viterbi => BackPointer::Derivation {
                rule: rule.id(),
                mid,
            },
            ParseType::Inside => BackPointer::Untracked,
        }
    }
}

/// Storage for the scores of one span.
pub trait ChartCell {
    /// Offers a derivation of `rule.parent()` over this cell's span with the given score.
    ///
    /// # Panics
    ///
    /// Panics if the cell is closed.
    fn update_cell(&mut self, mid: usize, rule: &Rule, score: f64);

    /// Returns the score of a symbol, or the semiring zero if the symbol never received an
    /// update.
    fn score(&self, sym: Symbol) -> f64;

    /// Checks whether a symbol received at least one update.
    fn contains(&self, sym: Symbol) -> bool;

    /// Returns the back pointer of a symbol, or `None` if the symbol never received an update.
    fn back_pointer(&self, sym: Symbol) -> Option<BackPointer>;

    /// Returns the symbols that received updates. The cell must be closed.
    fn symbols_present(&self) -> &[Symbol];

    /// Freezes the cell.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Clears all entries and reopens the cell.
    fn reset(&mut self);
}

impl<C: ChartCell + ?Sized> ChartCell for Box<C> {
    #[inline]
    fn update_cell(&mut self, mid: usize, rule: &Rule, score: f64) {
        (**self).update_cell(mid, rule, score)
    }

    #[inline]
    fn score(&self, sym: Symbol) -> f64 {
        (**self).score(sym)
    }

    #[inline]
    fn contains(&self, sym: Symbol) -> bool {
        (**self).contains(sym)
    }

    #[inline]
    fn back_pointer(&self, sym: Symbol) -> Option<BackPointer> {
        (**self).back_pointer(sym)
    }

    #[inline]
    fn symbols_present(&self) -> &[Symbol] {
        (**self).symbols_present()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// What to do when a symbol that already has an entry receives another update.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Merge {
    /// The offered derivation wins.
    Replace,
    /// Both are kept, summed into the given score.
    Accumulate(f64),
    /// The incumbent stays.
    Keep,
}

#[inline]
fn merge(parse_type: ParseType, current: f64, offered: f64) -> Merge {
    match parse_type {
        ParseType::Viterbi if offered > current => Merge::Replace,
        ParseType::Viterbi => Merge::Keep,
        ParseType::Inside => Merge::Accumulate(parse_type.plus(current, offered)),
    }
}

#[inline]
fn assert_open(closed: bool) {
    assert!(!closed, "update of a closed chart cell");
}
