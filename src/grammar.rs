//! Weighted grammars in Chomsky normal form, indexed for chart parsing.
//!
//! A grammar is built once, then shared read-only between any number of charts. Rules are
//! partitioned in a single pass into indexes of lexical rules by terminal, unary rules by child
//! and by parent, and binary rules in the layout required by the chosen [`LoopOrder`].

use std::mem;

use log::debug;
use thiserror::Error;

use crate::rule::builder::RuleBuilder;
use crate::rule::container::RuleContainer;
use crate::rule::RuleRhs::*;
use crate::rule::{Rule, RuleId};
use crate::symbol::{Alphabet, Symbol, SymbolBitSet};

/// The nested-loop pattern used to find binary rules that combine two adjacent cells.
///
/// The choice has no effect on scores.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum LoopOrder {
    /// Iterate over all pairs of symbols present in the two cells, then look up rules by pair.
    CartesianProduct,
    /// Iterate over the symbols of the left cell, then over rules with that left child.
    #[default]
    LeftChild,
    /// Iterate over the symbols of the right cell, then over rules with that right child.
    RightChild,
}

/// Errors detected while building or re-scoring a grammar.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum GrammarError {
    #[error("root symbol {root} is outside the alphabet of {num_nonterminals} nonterminals")]
    RootOutOfRange { root: usize, num_nonterminals: usize },

    #[error("grammar has no root symbol")]
    MissingRoot,

    #[error("rule {rule} refers to nonterminal {symbol}, outside the alphabet of {num_nonterminals}")]
    NonterminalOutOfRange {
        rule: usize,
        symbol: usize,
        num_nonterminals: usize,
    },

    #[error("rule {rule} refers to terminal {symbol}, outside the alphabet of {num_terminals}")]
    TerminalOutOfRange {
        rule: usize,
        symbol: usize,
        num_terminals: usize,
    },

    #[error("rule {rule} has invalid score {score}")]
    InvalidScore { rule: usize, score: f64 },

    #[error("no rule with id {rule}; the grammar has {num_rules} rules")]
    UnknownRule { rule: usize, num_rules: usize },

    #[error("expected {expected} scores, got {got}")]
    ScoreCountMismatch { expected: usize, got: usize },

    #[error("unary rules form a cycle through nonterminal {symbol}")]
    UnaryCycle { symbol: usize },
}

/// Binary rules, laid out for one loop order.
#[derive(Clone, Debug)]
enum BinaryIndex {
    /// Rules by `left * num_nonterminals + right`.
    ByPair(Vec<Vec<RuleId>>),
    ByLeftChild(Vec<Vec<RuleId>>),
    ByRightChild(Vec<Vec<RuleId>>),
}

impl BinaryIndex {
    fn loop_order(&self) -> LoopOrder {
        match *self {
            BinaryIndex::ByPair(_) => LoopOrder::CartesianProduct,
            BinaryIndex::ByLeftChild(_) => LoopOrder::LeftChild,
            BinaryIndex::ByRightChild(_) => LoopOrder::RightChild,
        }
    }
}

/// An indexed grammar in Chomsky normal form.
#[derive(Clone, Debug)]
pub struct CnfGrammar {
    nonterminals: Alphabet,
    terminals: Alphabet,
    root: Symbol,
    rules: Vec<Rule>,
    lexical_by_terminal: Vec<Vec<RuleId>>,
    unary_by_child: Vec<Vec<RuleId>>,
    unary_by_parent: Vec<Vec<RuleId>>,
    binary: BinaryIndex,
    /// Symbols of unary rules, each child before all of its parents.
    unary_order: Vec<Symbol>,
    /// Nonterminals that occur as the left child of some binary rule.
    left_children: SymbolBitSet,
    /// Nonterminals that occur as the right child of some binary rule.
    right_children: SymbolBitSet,
}

impl CnfGrammar {
    /// Validates the rules and builds all indexes.
    ///
    /// Rule IDs are reassigned to positions in `rules`.
    pub fn new(
        nonterminals: Alphabet,
        terminals: Alphabet,
        root: Symbol,
        mut rules: Vec<Rule>,
        loop_order: LoopOrder,
    ) -> Result<Self, GrammarError> {
        let num_nonterminals = nonterminals.len();
        let num_terminals = terminals.len();
        if !nonterminals.contains(root) {
            return Err(GrammarError::RootOutOfRange {
                root: root.usize(),
                num_nonterminals,
            });
        }
        for (pos, rule) in rules.iter_mut().enumerate() {
            rule.set_id(RuleId::from(pos));
            check_score(pos, rule.score())?;
            let nonterminal_syms = match rule.rhs() {
                Lexical(terminal) => {
                    if !terminals.contains(terminal) {
                        return Err(GrammarError::TerminalOutOfRange {
                            rule: pos,
                            symbol: terminal.usize(),
                            num_terminals,
                        });
                    }
                    [Some(rule.parent()), None, None]
                }
                Unary(child) => [Some(rule.parent()), Some(child), None],
                Binary([left, right]) => [Some(rule.parent()), Some(left), Some(right)],
            };
            for sym in nonterminal_syms.into_iter().flatten() {
                if !nonterminals.contains(sym) {
                    return Err(GrammarError::NonterminalOutOfRange {
                        rule: pos,
                        symbol: sym.usize(),
                        num_nonterminals,
                    });
                }
            }
        }

        let mut lexical_by_terminal = vec![vec![]; num_terminals];
        let mut unary_by_child = vec![vec![]; num_nonterminals];
        let mut unary_by_parent = vec![vec![]; num_nonterminals];
        let mut left_children = SymbolBitSet::new(num_nonterminals, false);
        let mut right_children = SymbolBitSet::new(num_nonterminals, false);
        for rule in &rules {
            match rule.rhs() {
                Lexical(terminal) => lexical_by_terminal[terminal.usize()].push(rule.id()),
                Unary(child) => {
                    unary_by_child[child.usize()].push(rule.id());
                    unary_by_parent[rule.parent().usize()].push(rule.id());
                }
                Binary([left, right]) => {
                    left_children.set(left, true);
                    right_children.set(right, true);
                }
            }
        }
        let unary_order = unary_closure_order(&rules, &unary_by_parent)?;
        let binary = build_binary_index(&rules, num_nonterminals, loop_order);

        let grammar = CnfGrammar {
            nonterminals,
            terminals,
            root,
            rules,
            lexical_by_terminal,
            unary_by_child,
            unary_by_parent,
            binary,
            unary_order,
            left_children,
            right_children,
        };
        debug!(
            "indexed grammar: {} nonterminals, {} terminals, {} rules ({} lexical, {} unary, {} binary), {:?}",
            grammar.num_nonterminals(),
            grammar.num_terminals(),
            grammar.rules.len(),
            grammar.rules.iter().filter(|r| r.is_lexical()).count(),
            grammar.rules.iter().filter(|r| r.is_unary()).count(),
            grammar.rules.iter().filter(|r| r.is_binary()).count(),
            loop_order,
        );
        Ok(grammar)
    }

    /// Rebuilds the binary rule index for another loop order.
    pub fn reindex(&mut self, loop_order: LoopOrder) {
        if self.loop_order() != loop_order {
            let binary = build_binary_index(&self.rules, self.num_nonterminals(), loop_order);
            let old = mem::replace(&mut self.binary, binary);
            debug!("reindexed binary rules from {:?} to {:?}", old.loop_order(), loop_order);
        }
    }

    /// The loop order the binary rules are indexed for.
    pub fn loop_order(&self) -> LoopOrder {
        self.binary.loop_order()
    }

    pub fn root(&self) -> Symbol {
        self.root
    }

    pub fn nonterminals(&self) -> &Alphabet {
        &self.nonterminals
    }

    pub fn terminals(&self) -> &Alphabet {
        &self.terminals
    }

    pub fn num_nonterminals(&self) -> usize {
        self.nonterminals.len()
    }

    pub fn num_terminals(&self) -> usize {
        self.terminals.len()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[inline]
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.usize()]
    }

    /// Assigns a new score to a rule, leaving the indexes untouched.
    pub fn set_rule_score(&mut self, id: RuleId, score: f64) -> Result<(), GrammarError> {
        let num_rules = self.rules.len();
        let rule = self
            .rules
            .get_mut(id.usize())
            .ok_or(GrammarError::UnknownRule {
                rule: id.usize(),
                num_rules,
            })?;
        check_score(id.usize(), score)?;
        rule.set_score(score);
        Ok(())
    }

    /// Assigns new scores to all rules, in rule ID order.
    pub fn set_scores(&mut self, scores: &[f64]) -> Result<(), GrammarError> {
        if scores.len() != self.rules.len() {
            return Err(GrammarError::ScoreCountMismatch {
                expected: self.rules.len(),
                got: scores.len(),
            });
        }
        for (pos, &score) in scores.iter().enumerate() {
            check_score(pos, score)?;
        }
        for (rule, &score) in self.rules.iter_mut().zip(scores) {
            rule.set_score(score);
        }
        Ok(())
    }

    /// Returns lexical rules with the given terminal on the RHS.
    #[inline]
    pub fn lexical_rules_with_child(&self, terminal: Symbol) -> &[RuleId] {
        lookup(&self.lexical_by_terminal, terminal)
    }

    #[inline]
    pub fn unary_rules_with_child(&self, child: Symbol) -> &[RuleId] {
        lookup(&self.unary_by_child, child)
    }

    #[inline]
    pub fn unary_rules_with_parent(&self, parent: Symbol) -> &[RuleId] {
        lookup(&self.unary_by_parent, parent)
    }

    /// Returns the symbols of unary rules ordered so that every child comes before its parents.
    ///
    /// Applying unary rules child by child in this order closes a cell under unary chains in a
    /// single sweep.
    #[inline]
    pub fn unary_closure_order(&self) -> &[Symbol] {
        &self.unary_order[..]
    }

    /// Returns binary rules of the form `_ ::= left right`.
    ///
    /// Available only when indexed for [`LoopOrder::CartesianProduct`].
    #[inline]
    pub fn binary_rules_with_children(&self, left: Symbol, right: Symbol) -> &[RuleId] {
        match self.binary {
            BinaryIndex::ByPair(ref by_pair) => {
                let num_nonterminals = self.num_nonterminals();
                if left.usize() < num_nonterminals && right.usize() < num_nonterminals {
                    &by_pair[left.usize() * num_nonterminals + right.usize()][..]
                } else {
                    &[]
                }
            }
            _ => {
                debug_assert!(false, "binary rules are not indexed by pair");
                &[]
            }
        }
    }

    /// Returns binary rules of the form `_ ::= left _`.
    ///
    /// Available only when indexed for [`LoopOrder::LeftChild`].
    #[inline]
    pub fn binary_rules_with_left_child(&self, left: Symbol) -> &[RuleId] {
        match self.binary {
            BinaryIndex::ByLeftChild(ref by_left) => lookup(by_left, left),
            _ => {
                debug_assert!(false, "binary rules are not indexed by left child");
                &[]
            }
        }
    }

    /// Returns binary rules of the form `_ ::= _ right`.
    ///
    /// Available only when indexed for [`LoopOrder::RightChild`].
    #[inline]
    pub fn binary_rules_with_right_child(&self, right: Symbol) -> &[RuleId] {
        match self.binary {
            BinaryIndex::ByRightChild(ref by_right) => lookup(by_right, right),
            _ => {
                debug_assert!(false, "binary rules are not indexed by right child");
                &[]
            }
        }
    }

    /// Checks whether the symbol is the left child of any binary rule.
    #[inline]
    pub fn is_left_child(&self, sym: Symbol) -> bool {
        self.left_children.has_sym(sym)
    }

    /// Checks whether the symbol is the right child of any binary rule.
    #[inline]
    pub fn is_right_child(&self, sym: Symbol) -> bool {
        self.right_children.has_sym(sym)
    }
}

fn check_score(rule: usize, score: f64) -> Result<(), GrammarError> {
    // Minus infinity is a valid log score of an impossible rule.
    if score.is_nan() || score == f64::INFINITY {
        Err(GrammarError::InvalidScore { rule, score })
    } else {
        Ok(())
    }
}

fn lookup(index: &[Vec<RuleId>], sym: Symbol) -> &[RuleId] {
    index.get(sym.usize()).map_or(&[][..], |ids| &ids[..])
}

/// Sorts the symbols of unary rules topologically, children first. Fails on a cycle.
fn unary_closure_order(
    rules: &[Rule],
    unary_by_parent: &[Vec<RuleId>],
) -> Result<Vec<Symbol>, GrammarError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnStack,
        Done,
    }
    let mut marks = vec![Mark::Unvisited; unary_by_parent.len()];
    let mut order = vec![];
    // Depth-first, with the next unary rule to follow for each symbol on the stack.
    let mut stack: Vec<(usize, usize)> = vec![];
    for top in 0..unary_by_parent.len() {
        if marks[top] != Mark::Unvisited || unary_by_parent[top].is_empty() {
            continue;
        }
        marks[top] = Mark::OnStack;
        stack.push((top, 0));
        while let Some(frame) = stack.last_mut() {
            let (parent, next) = *frame;
            match unary_by_parent[parent].get(next) {
                Some(&id) => {
                    frame.1 += 1;
                    let child = rules[id.usize()].left_child().usize();
                    match marks[child] {
                        Mark::Unvisited => {
                            marks[child] = Mark::OnStack;
                            stack.push((child, 0));
                        }
                        Mark::OnStack => return Err(GrammarError::UnaryCycle { symbol: child }),
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[parent] = Mark::Done;
                    order.push(Symbol::from(parent));
                    stack.pop();
                }
            }
        }
    }
    Ok(order)
}

fn build_binary_index(rules: &[Rule], num_nonterminals: usize, loop_order: LoopOrder) -> BinaryIndex {
    let binary_rules = rules.iter().filter_map(|rule| match rule.rhs() {
        Binary([left, right]) => Some((rule.id(), left, right)),
        _ => None,
    });
    match loop_order {
        LoopOrder::CartesianProduct => {
            let mut by_pair = vec![vec![]; num_nonterminals * num_nonterminals];
            for (id, left, right) in binary_rules {
                by_pair[left.usize() * num_nonterminals + right.usize()].push(id);
            }
            BinaryIndex::ByPair(by_pair)
        }
        LoopOrder::LeftChild => {
            let mut by_left = vec![vec![]; num_nonterminals];
            for (id, left, _) in binary_rules {
                by_left[left.usize()].push(id);
            }
            BinaryIndex::ByLeftChild(by_left)
        }
        LoopOrder::RightChild => {
            let mut by_right = vec![vec![]; num_nonterminals];
            for (id, _, right) in binary_rules {
                by_right[right.usize()].push(id);
            }
            BinaryIndex::ByRightChild(by_right)
        }
    }
}

/// Collects rules and symbol names for a [`CnfGrammar`].
#[derive(Clone, Debug, Default)]
pub struct GrammarBuilder {
    nonterminals: Alphabet,
    terminals: Alphabet,
    root: Option<Symbol>,
    rules: Vec<Rule>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a nonterminal.
    pub fn nonterminal(&mut self, name: &str) -> Symbol {
        self.nonterminals.intern(name)
    }

    /// Interns a terminal.
    pub fn terminal(&mut self, name: &str) -> Symbol {
        self.terminals.intern(name)
    }

    /// Interns `N` nonterminals.
    pub fn nonterminals<const N: usize>(&mut self, names: [&str; N]) -> [Symbol; N] {
        self.nonterminals.syms(names)
    }

    /// Interns `N` terminals.
    pub fn terminals<const N: usize>(&mut self, names: [&str; N]) -> [Symbol; N] {
        self.terminals.syms(names)
    }

    pub fn set_root(&mut self, root: Symbol) -> &mut Self {
        self.root = Some(root);
        self
    }

    /// Starts building a new rule.
    pub fn rule(&mut self, lhs: Symbol) -> RuleBuilder<&mut Self> {
        RuleBuilder::new(self).rule(lhs)
    }

    /// Drops rules that can never apply, i.e. those scored minus infinity.
    pub fn remove_impossible_rules(&mut self) -> &mut Self {
        self.retain(|rule| rule.score() != f64::NEG_INFINITY);
        self
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// Validates the collected rules and indexes them for the given loop order.
    pub fn build(&self, loop_order: LoopOrder) -> Result<CnfGrammar, GrammarError> {
        let root = self.root.ok_or(GrammarError::MissingRoot)?;
        CnfGrammar::new(
            self.nonterminals.clone(),
            self.terminals.clone(),
            root,
            self.rules.clone(),
            loop_order,
        )
    }
}

impl RuleContainer for GrammarBuilder {
    fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Rule) -> bool,
    {
        self.rules.retain(f);
    }
}
