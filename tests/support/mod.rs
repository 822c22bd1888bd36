#![allow(dead_code)]

use cfg_cky::semiring::log_add;
use cfg_cky::*;

pub const CELL_TYPES: [CellType; 3] = [CellType::Full, CellType::Hashed, CellType::DoubleHashed];

pub const LOOP_ORDERS: [LoopOrder; 3] = [
    LoopOrder::CartesianProduct,
    LoopOrder::LeftChild,
    LoopOrder::RightChild,
];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn sentence(grammar: &CnfGrammar, text: &str) -> Vec<Symbol> {
    grammar
        .terminals()
        .lookup_all(text.split_whitespace())
        .expect("unknown token")
}

pub fn assert_close(a: f64, b: f64) {
    assert!(
        a == b || (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
        "{} != {}",
        a,
        b
    );
}

/// "the dog barks" has a single derivation of score -3.
pub fn dog_grammar(loop_order: LoopOrder) -> CnfGrammar {
    let mut builder = GrammarBuilder::new();
    let [s, np, vp, dt, nn, v] = builder.nonterminals(["S", "NP", "VP", "DT", "NN", "V"]);
    let [the, dog, barks] = builder.terminals(["the", "dog", "barks"]);
    builder
        .rule(s)
        .binary(np, vp, -1.0)
        .rule(np)
        .binary(dt, nn, -1.0)
        .rule(vp)
        .unary(v, -1.0)
        .rule(dt)
        .lexical(the, 0.0)
        .rule(nn)
        .lexical(dog, 0.0)
        .rule(v)
        .lexical(barks, 0.0);
    builder.set_root(s);
    builder.build(loop_order).unwrap()
}

/// A normalized PCFG with attachment ambiguity and unary rules.
pub fn pp_attachment_grammar(loop_order: LoopOrder) -> CnfGrammar {
    let mut builder = GrammarBuilder::new();
    let [s, np, vp, pp, n, v, p, det] =
        builder.nonterminals(["S", "NP", "VP", "PP", "N", "V", "P", "Det"]);
    let [the, man, saw, fish, with, telescope] =
        builder.terminals(["the", "man", "saw", "fish", "with", "telescope"]);
    let ln = f64::ln;
    builder
        .rule(s)
        .binary(np, vp, ln(1.0))
        .rule(vp)
        .binary(v, np, ln(0.5))
        .binary(vp, pp, ln(0.3))
        .unary(v, ln(0.2))
        .rule(np)
        .binary(np, pp, ln(0.2))
        .binary(det, n, ln(0.5))
        .unary(n, ln(0.3))
        .rule(pp)
        .binary(p, np, ln(1.0))
        .rule(n)
        .lexical(fish, ln(0.4))
        .lexical(telescope, ln(0.3))
        .lexical(man, ln(0.3))
        .rule(v)
        .lexical(saw, ln(0.6))
        .lexical(fish, ln(0.4))
        .rule(p)
        .lexical(with, ln(1.0))
        .rule(det)
        .lexical(the, ln(1.0));
    builder.set_root(s);
    builder.build(loop_order).unwrap()
}

/// "x x" has two derivations of equal score, `S -> A A` and `S -> B B`.
pub fn tied_grammar(loop_order: LoopOrder) -> CnfGrammar {
    let mut builder = GrammarBuilder::new();
    let [s, a, b] = builder.nonterminals(["S", "A", "B"]);
    let [x] = builder.terminals(["x"]);
    builder
        .rule(s)
        .binary(a, a, -1.0)
        .binary(b, b, -1.0)
        .rule(a)
        .lexical(x, -0.5)
        .rule(b)
        .lexical(x, -0.5);
    builder.set_root(s);
    builder.build(loop_order).unwrap()
}

/// `S -> A`, `A -> x | B`, `B -> x`: the best reading of "x" goes through the chain `S -> A -> B`.
/// With `normalized`, rule probabilities sum to one per parent.
pub fn unary_chain_grammar(normalized: bool) -> CnfGrammar {
    let mut builder = GrammarBuilder::new();
    let [s, a, b] = builder.nonterminals(["S", "A", "B"]);
    let [x] = builder.terminals(["x"]);
    let (a_to_x, a_to_b) = if normalized {
        (0.5f64.ln(), 0.5f64.ln())
    } else {
        (-2.0, -0.1)
    };
    builder
        .rule(s)
        .unary(a, 0.0)
        .rule(a)
        .lexical(x, a_to_x)
        .unary(b, a_to_b)
        .rule(b)
        .lexical(x, 0.0);
    builder.set_root(s);
    builder.build(LoopOrder::LeftChild).unwrap()
}

/// A normalized PCFG whose constituents are topped by unary chains up to three rules deep:
/// `S -> S S | T`, `T -> U | x`, `U -> V | y`, `V -> x | y`.
pub fn deep_unary_grammar(loop_order: LoopOrder) -> CnfGrammar {
    let mut builder = GrammarBuilder::new();
    let [s, t, u, v] = builder.nonterminals(["S", "T", "U", "V"]);
    let [x, y] = builder.terminals(["x", "y"]);
    let ln = f64::ln;
    builder
        .rule(s)
        .binary(s, s, ln(0.3))
        .unary(t, ln(0.7))
        .rule(t)
        .unary(u, ln(0.6))
        .lexical(x, ln(0.4))
        .rule(u)
        .unary(v, ln(0.5))
        .lexical(y, ln(0.5))
        .rule(v)
        .lexical(x, ln(0.5))
        .lexical(y, ln(0.5));
    builder.set_root(s);
    builder.build(loop_order).unwrap()
}

/// Every binary bracketing of a string of `x`, with `S -> S S | x`.
pub fn bracketing_grammar(loop_order: LoopOrder) -> CnfGrammar {
    let mut builder = GrammarBuilder::new();
    let [s] = builder.nonterminals(["S"]);
    let [x] = builder.terminals(["x"]);
    builder.rule(s).binary(s, s, -1.0).lexical(x, -0.25);
    builder.set_root(s);
    builder.build(loop_order).unwrap()
}

/// Sums the static scores of the rules applied in `tree`. Each node is matched to the best
/// rule of its shape.
pub fn tree_score(grammar: &CnfGrammar, tree: &ParseTree) -> f64 {
    let (symbol, children) = match *tree {
        ParseTree::Leaf { .. } => return 0.0,
        ParseTree::Node {
            symbol,
            ref children,
            ..
        } => (symbol, children),
    };
    let rhs = match children[..] {
        [ParseTree::Leaf { terminal, .. }] => RuleRhs::Lexical(terminal),
        [ref child] => RuleRhs::Unary(child.symbol()),
        [ref left, ref right] => RuleRhs::Binary([left.symbol(), right.symbol()]),
        _ => panic!("node with {} children", children.len()),
    };
    let rule_score = grammar
        .rules()
        .iter()
        .filter(|rule| rule.parent() == symbol && rule.rhs() == rhs)
        .map(|rule| rule.score())
        .fold(f64::NEG_INFINITY, f64::max);
    children
        .iter()
        .map(|child| tree_score(grammar, child))
        .sum::<f64>()
        + rule_score
}

/// One derivation found by exhaustive enumeration.
#[derive(Clone, Debug)]
pub struct Derivation {
    pub score: f64,
    pub tree: ParseTree,
    pub rules: Vec<RuleId>,
}

/// Enumerates every derivation of `sentence` from the root. Unary chains on top of a lexical or
/// binary constituent may be as long as the number of nonterminals. Rule applications for which
/// `allow` returns `false` are skipped.
pub fn enumerate<S, A>(grammar: &CnfGrammar, sentence: &[Symbol], scorer: &S, allow: &A) -> Vec<Derivation>
where
    S: Scorer,
    A: Fn(usize, usize, usize, &Rule) -> bool,
{
    if sentence.is_empty() {
        return vec![];
    }
    let enumerator = Enumerator {
        grammar,
        sentence,
        scorer,
        allow,
    };
    enumerator.derive(grammar.root(), 0, sentence.len(), grammar.num_nonterminals())
}

pub fn enumerate_all(grammar: &CnfGrammar, sentence: &[Symbol]) -> Vec<Derivation> {
    enumerate(grammar, sentence, &RuleScorer, &|_, _, _, _: &Rule| true)
}

pub fn best(derivations: &[Derivation]) -> Option<f64> {
    derivations
        .iter()
        .map(|derivation| derivation.score)
        .fold(None, |best, score| Some(best.map_or(score, |best: f64| best.max(score))))
}

pub fn total(derivations: &[Derivation]) -> f64 {
    derivations
        .iter()
        .fold(f64::NEG_INFINITY, |total, derivation| log_add(total, derivation.score))
}

struct Enumerator<'a, S, A> {
    grammar: &'a CnfGrammar,
    sentence: &'a [Symbol],
    scorer: &'a S,
    allow: &'a A,
}

impl<'a, S, A> Enumerator<'a, S, A>
where
    S: Scorer,
    A: Fn(usize, usize, usize, &Rule) -> bool,
{
    /// Derivations of `sym` over `[start, end)` topped by at most `unary_depth` unary rules.
    fn derive(&self, sym: Symbol, start: usize, end: usize, unary_depth: usize) -> Vec<Derivation> {
        let mut result = self.derive_base(sym, start, end);
        if unary_depth > 0 {
            for rule in self.grammar.rules() {
                if !rule.is_unary() || rule.parent() != sym || !(self.allow)(start, end, end, rule) {
                    continue;
                }
                let score = self.scorer.score(rule, start, end, end);
                for child in self.derive(rule.left_child(), start, end, unary_depth - 1) {
                    let mut rules = vec![rule.id()];
                    rules.extend(child.rules);
                    result.push(Derivation {
                        score: child.score + score,
                        tree: ParseTree::Node {
                            symbol: sym,
                            start,
                            end,
                            children: vec![child.tree],
                        },
                        rules,
                    });
                }
            }
        }
        result
    }

    fn derive_base(&self, sym: Symbol, start: usize, end: usize) -> Vec<Derivation> {
        let mut result = vec![];
        for rule in self.grammar.rules() {
            if rule.parent() != sym {
                continue;
            }
            match rule.rhs() {
                RuleRhs::Lexical(terminal) => {
                    if end != start + 1
                        || self.sentence[start] != terminal
                        || !(self.allow)(start, end, start, rule)
                    {
                        continue;
                    }
                    result.push(Derivation {
                        score: self.scorer.score(rule, start, start, end),
                        tree: ParseTree::Node {
                            symbol: sym,
                            start,
                            end,
                            children: vec![ParseTree::Leaf {
                                terminal,
                                position: start,
                            }],
                        },
                        rules: vec![rule.id()],
                    });
                }
                RuleRhs::Binary([left, right]) => {
                    for mid in start + 1..end {
                        if !(self.allow)(start, end, mid, rule) {
                            continue;
                        }
                        let score = self.scorer.score(rule, start, mid, end);
                        let depth = self.grammar.num_nonterminals();
                        let lefts = self.derive(left, start, mid, depth);
                        if lefts.is_empty() {
                            continue;
                        }
                        let rights = self.derive(right, mid, end, depth);
                        for l in &lefts {
                            for r in &rights {
                                let mut rules = vec![rule.id()];
                                rules.extend(l.rules.iter().copied());
                                rules.extend(r.rules.iter().copied());
                                result.push(Derivation {
                                    score: (l.score + r.score) + score,
                                    tree: ParseTree::Node {
                                        symbol: sym,
                                        start,
                                        end,
                                        children: vec![l.tree.clone(), r.tree.clone()],
                                    },
                                    rules,
                                });
                            }
                        }
                    }
                }
                RuleRhs::Unary(_) => {}
            }
        }
        result
    }
}
