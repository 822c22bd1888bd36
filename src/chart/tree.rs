//! Reconstruction of the best derivation from back pointers.

use std::fmt::Write;

use super::Chart;
use crate::cell::BackPointer;
use crate::grammar::CnfGrammar;
use crate::rule::RuleRhs::*;
use crate::symbol::Symbol;

/// A derivation tree over a sentence.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum ParseTree {
    /// A token of the sentence.
    Leaf { terminal: Symbol, position: usize },
    /// A nonterminal over `[start, end)`, with one child for lexical and unary rules and two
    /// for binary rules.
    Node {
        symbol: Symbol,
        start: usize,
        end: usize,
        children: Vec<ParseTree>,
    },
}

/// The best-scoring derivation of a sentence.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ViterbiParse {
    pub tree: ParseTree,
    pub score: f64,
}

impl ParseTree {
    /// The terminal or nonterminal at the top of this tree.
    pub fn symbol(&self) -> Symbol {
        match *self {
            ParseTree::Leaf { terminal, .. } => terminal,
            ParseTree::Node { symbol, .. } => symbol,
        }
    }

    pub fn span(&self) -> (usize, usize) {
        match *self {
            ParseTree::Leaf { position, .. } => (position, position + 1),
            ParseTree::Node { start, end, .. } => (start, end),
        }
    }

    pub fn children(&self) -> &[ParseTree] {
        match *self {
            ParseTree::Leaf { .. } => &[],
            ParseTree::Node { ref children, .. } => &children[..],
        }
    }

    /// Collects the terminals at the leaves, left to right.
    pub fn leaves(&self) -> Vec<Symbol> {
        let mut leaves = vec![];
        let mut work = vec![self];
        while let Some(tree) = work.pop() {
            match *tree {
                ParseTree::Leaf { terminal, .. } => leaves.push(terminal),
                ParseTree::Node { ref children, .. } => work.extend(children.iter().rev()),
            }
        }
        leaves
    }

    /// Collects the spans of all nodes with two children.
    pub fn binary_spans(&self) -> Vec<(usize, usize, usize)> {
        let mut spans = vec![];
        let mut work = vec![self];
        while let Some(tree) = work.pop() {
            if let ParseTree::Node {
                start,
                end,
                ref children,
                ..
            } = *tree
            {
                if let [ref left, _] = children[..] {
                    spans.push((start, left.span().1, end));
                }
                work.extend(children.iter());
            }
        }
        spans.sort_unstable();
        spans
    }

    /// Writes the tree in bracketed notation, e.g. `(S (NP the) (VP runs))`, with symbol names
    /// taken from the grammar's alphabets.
    pub fn to_bracketed(&self, grammar: &CnfGrammar) -> String {
        let mut out = String::new();
        self.write_bracketed(grammar, &mut out);
        out
    }

    fn write_bracketed(&self, grammar: &CnfGrammar, out: &mut String) {
        match *self {
            ParseTree::Leaf { terminal, .. } => {
                write_name(out, grammar.terminals().name(terminal), terminal)
            }
            ParseTree::Node {
                symbol,
                ref children,
                ..
            } => {
                out.push('(');
                write_name(out, grammar.nonterminals().name(symbol), symbol);
                for child in children {
                    out.push(' ');
                    child.write_bracketed(grammar, out);
                }
                out.push(')');
            }
        }
    }
}

fn write_name(out: &mut String, name: Option<&str>, sym: Symbol) {
    match name {
        Some(name) => out.push_str(name),
        None => {
            let _ = write!(out, "#{}", sym.usize());
        }
    }
}

impl<'g> Chart<'g> {
    /// Follows back pointers from the root over the whole sentence.
    ///
    /// Returns `None` if the root never received an update, or if the chart holds inside
    /// scores, which have no back pointers to follow.
    pub fn viterbi_parse(&self) -> Option<ViterbiParse> {
        let len = self.sentence_len();
        if len == 0 {
            return None;
        }
        let root = self.grammar().root();
        let tree = self.subtree(root, 0, len, 0)?;
        Some(ViterbiParse {
            tree,
            score: self.score(root, 0, len),
        })
    }

    fn subtree(&self, sym: Symbol, start: usize, end: usize, unary_depth: usize) -> Option<ParseTree> {
        let grammar = self.grammar();
        // A unary chain longer than the alphabet must loop.
        if unary_depth > grammar.num_nonterminals() {
            return None;
        }
        let (rule, mid) = match self.back_pointer(sym, start, end)? {
            BackPointer::Derivation { rule, mid } => (grammar.rule(rule), mid),
            BackPointer::Untracked => return None,
        };
        let children = match rule.rhs() {
            Lexical(terminal) => vec![ParseTree::Leaf {
                terminal,
                position: mid,
            }],
            Unary(child) => vec![self.subtree(child, start, end, unary_depth + 1)?],
            Binary([left, right]) => vec![
                self.subtree(left, start, mid, 0)?,
                self.subtree(right, mid, end, 0)?,
            ],
        };
        Some(ParseTree::Node {
            symbol: sym,
            start,
            end,
            children,
        })
    }
}
