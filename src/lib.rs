//! CYK chart parsing for weighted context-free grammars in Chomsky normal form.
//!
//! A [`CnfGrammar`] is built once and shared by any number of [`Chart`]s. A chart is filled
//! bottom-up over one sentence at a time, with either Viterbi scores, from which the best tree
//! is read back, or inside scores, which [`InsideOutside`] turns into posterior marginals and
//! expected rule counts. Scores are log probabilities throughout.
//!
//! The representation of chart cells is chosen by [`ChartConfig`] and never changes the
//! resulting scores. Cells can be filtered through a [`CellConstraint`], and rule scores can
//! depend on their span through a [`Scorer`].

#![deny(
        missing_copy_implementations,
        trivial_casts,
        trivial_numeric_casts,
        unused_import_braces,
        unused_qualifications)]

#[cfg(feature = "serialize")]
#[macro_use]
extern crate serde_derive;

pub mod cell;
pub mod chart;
pub mod cky;
pub mod constraint;
pub mod grammar;
pub mod inside_outside;
pub mod rule;
pub mod scorer;
pub mod semiring;
pub mod symbol;

pub use cell::{BackPointer, ChartCell, JitterSource};
pub use chart::{CellType, Chart, ChartConfig, ChartError, ParseTree, ViterbiParse};
pub use cky::CkyParser;
pub use constraint::{BracketConstraint, CellConstraint, FnConstraint, SharedConstraint};
pub use grammar::{CnfGrammar, GrammarBuilder, GrammarError, LoopOrder};
pub use inside_outside::InsideOutside;
pub use rule::{Rule, RuleId, RuleRhs};
pub use scorer::{RuleScorer, Scorer};
pub use semiring::ParseType;
pub use symbol::{Alphabet, Symbol};
