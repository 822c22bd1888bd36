//! Log-space semirings for chart scores.
//!
//! Scores are log probabilities. Combining the scores of the parts of a derivation is addition
//! in both semirings; aggregating alternative derivations is `max` for Viterbi decoding and
//! log-sum-exp for inside scores.

/// The semiring a chart is filled with.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ParseType {
    /// Best derivation: `(max, +)`.
    #[default]
    Viterbi,
    /// Sum over derivations: `(log-sum-exp, +)`.
    Inside,
}

impl ParseType {
    /// The additive identity, `log 0`.
    #[inline]
    pub fn zero(self) -> f64 {
        f64::NEG_INFINITY
    }

    /// The multiplicative identity, `log 1`.
    #[inline]
    pub fn one(self) -> f64 {
        0.0
    }

    /// Aggregates two alternatives.
    #[inline]
    pub fn plus(self, a: f64, b: f64) -> f64 {
        match self {
            ParseType::Viterbi => a.max(b),
            ParseType::Inside => log_add(a, b),
        }
    }

    /// Combines the scores of two parts of one derivation.
    #[inline]
    pub fn times(self, a: f64, b: f64) -> f64 {
        a + b
    }
}

/// Computes `log(exp(a) + exp(b))` without leaving log space.
#[inline]
pub fn log_add(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f64::NEG_INFINITY {
        hi
    } else {
        hi + (lo - hi).exp().ln_1p()
    }
}
