//! This module defines the rules of a grammar in Chomsky normal form. Each rule has a single
//! nonterminal on its left-hand side and, on its right-hand side, either one terminal, one
//! nonterminal or two nonterminals. Every rule carries a score in log space.

pub mod builder;
pub mod container;

use std::fmt;

use crate::symbol::Symbol;

use self::RuleRhs::*;

/// Position of a rule in its grammar's rule list.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct RuleId(u32);

impl RuleId {
    /// Cast the ID to `usize`.
    #[inline]
    pub fn usize(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for RuleId {
    #[inline]
    fn from(id: usize) -> Self {
        RuleId(id as u32)
    }
}

/// Compact representation of a rule's RHS.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RuleRhs {
    /// A single terminal.
    Lexical(Symbol),
    /// A single nonterminal.
    Unary(Symbol),
    /// Two nonterminals.
    Binary([Symbol; 2]),
}

/// A production with a score.
///
/// The structure of a rule is fixed once its grammar is built. Only the score may change, which
/// lets the same grammar be re-scored between training iterations.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rule {
    id: RuleId,
    parent: Symbol,
    rhs: RuleRhs,
    score: f64,
}

impl Rule {
    /// Creates a new rule. The ID is assigned when the rule is added to a grammar.
    pub fn new(parent: Symbol, rhs: RuleRhs, score: f64) -> Self {
        Rule {
            id: RuleId::default(),
            parent,
            rhs,
            score,
        }
    }

    /// Creates a rule of the form `parent ::= terminal`.
    pub fn lexical(parent: Symbol, terminal: Symbol, score: f64) -> Self {
        Rule::new(parent, Lexical(terminal), score)
    }

    /// Creates a rule of the form `parent ::= child`.
    pub fn unary(parent: Symbol, child: Symbol, score: f64) -> Self {
        Rule::new(parent, Unary(child), score)
    }

    /// Creates a rule of the form `parent ::= left right`.
    pub fn binary(parent: Symbol, left: Symbol, right: Symbol, score: f64) -> Self {
        Rule::new(parent, Binary([left, right]), score)
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: RuleId) {
        self.id = id;
    }

    /// Returns the rule's left-hand side.
    pub fn parent(&self) -> Symbol {
        self.parent
    }

    pub fn rhs(&self) -> RuleRhs {
        self.rhs
    }

    /// The score in log space.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub(crate) fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    /// Returns the first symbol on the RHS. For lexical rules, that symbol is a terminal.
    pub fn left_child(&self) -> Symbol {
        match self.rhs {
            Lexical(sym) | Unary(sym) => sym,
            Binary([left, _]) => left,
        }
    }

    /// Returns the second symbol on the RHS, if there is one.
    pub fn right_child(&self) -> Option<Symbol> {
        match self.rhs {
            Binary([_, right]) => Some(right),
            _ => None,
        }
    }

    pub fn is_lexical(&self) -> bool {
        matches!(self.rhs, Lexical(_))
    }

    pub fn is_unary(&self) -> bool {
        matches!(self.rhs, Unary(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.rhs, Binary(_))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parent = self.parent.usize();
        match self.rhs {
            Lexical(terminal) => write!(f, "{} ::= '{}'", parent, terminal.usize())?,
            Unary(child) => write!(f, "{} ::= {}", parent, child.usize())?,
            Binary([left, right]) => {
                write!(f, "{} ::= {} {}", parent, left.usize(), right.usize())?
            }
        }
        write!(f, " ({})", self.score)
    }
}
