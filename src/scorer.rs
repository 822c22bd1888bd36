//! Scores of rule applications.

use crate::rule::Rule;

/// Supplies the score of a rule applied over `[start, end)` with split point `mid`.
///
/// For lexical rules `mid == start`; for unary rules `mid == end`. Implementations let rule
/// scores depend on sentence-specific features.
pub trait Scorer {
    fn score(&self, rule: &Rule, start: usize, mid: usize, end: usize) -> f64;
}

/// The default scorer: every rule scores its static score.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleScorer;

impl Scorer for RuleScorer {
    #[inline]
    fn score(&self, rule: &Rule, _start: usize, _mid: usize, _end: usize) -> f64 {
        rule.score()
    }
}

impl<F> Scorer for F
where
    F: Fn(&Rule, usize, usize, usize) -> f64,
{
    #[inline]
    fn score(&self, rule: &Rule, start: usize, mid: usize, end: usize) -> f64 {
        self(rule, start, mid, end)
    }
}
