//! The outside pass and posterior marginals.
//!
//! The outside recurrence mirrors the inside one: cells are visited by decreasing width, each
//! pushing its outside scores down to the spans its derivations were built from. Unary rules are
//! pushed first, parents before children, then binary rules update both children in one step,
//! and lexical rules finish at the tokens.

use log::debug;

use crate::chart::{Chart, ChartError};
use crate::grammar::{CnfGrammar, LoopOrder};
use crate::rule::{Rule, RuleId};
use crate::scorer::Scorer;
use crate::semiring::{log_add, ParseType};
use crate::symbol::Symbol;

/// Inside and outside scores of one sentence, with the expected counts derived from them.
#[derive(Clone, Debug)]
pub struct InsideOutside {
    sentence_len: usize,
    num_nonterminals: usize,
    root: Symbol,
    /// Total inside score of the root over the sentence, `None` if it has no parse.
    log_z: Option<f64>,
    inside: Vec<f64>,
    outside: Vec<f64>,
    /// Outside score of each token.
    terminal_outside: Vec<f64>,
    rule_counts: Vec<f64>,
}

impl InsideOutside {
    /// Runs the outside pass over a filled inside chart, scoring rules with `scorer`.
    ///
    /// The scorer should be the one the chart was filled with.
    pub fn new<S>(chart: &Chart, scorer: &S) -> Result<Self, ChartError>
    where
        S: Scorer + ?Sized,
    {
        if chart.parse_type() != ParseType::Inside {
            return Err(ChartError::NotAnInsideChart {
                parse_type: chart.parse_type(),
            });
        }
        let grammar = chart.grammar();
        let len = chart.sentence_len();
        let num_nonterminals = grammar.num_nonterminals();
        let num_cells = len * (len + 1) / 2;
        let mut result = InsideOutside {
            sentence_len: len,
            num_nonterminals,
            root: grammar.root(),
            log_z: chart.root_score(),
            inside: vec![f64::NEG_INFINITY; num_cells * num_nonterminals],
            outside: vec![f64::NEG_INFINITY; num_cells * num_nonterminals],
            terminal_outside: vec![f64::NEG_INFINITY; len],
            rule_counts: vec![0.0; grammar.rules().len()],
        };
        if len == 0 {
            return Ok(result);
        }
        for start in 0..len {
            for end in start + 1..=len {
                let cell = chart.cell(start, end);
                let offset = result.offset(start, end);
                for &sym in cell.symbols_present() {
                    result.inside[offset + sym.usize()] = cell.score(sym);
                }
            }
        }
        let root_offset = result.offset(0, len) + result.root.usize();
        result.outside[root_offset] = ParseType::Inside.one();

        let log_z = match result.log_z {
            Some(log_z) if log_z > f64::NEG_INFINITY => log_z,
            _ => {
                debug!("no parse of {} tokens, outside pass skipped", len);
                return Ok(result);
            }
        };

        let mut pass = OutsidePass {
            grammar,
            chart,
            scorer,
            log_z,
            result: &mut result,
        };
        for width in (1..=len).rev() {
            for start in 0..=len - width {
                let end = start + width;
                pass.push_unary(start, end);
                if width > 1 {
                    for mid in start + 1..end {
                        match grammar.loop_order() {
                            LoopOrder::CartesianProduct => pass.push_by_pairs(start, mid, end),
                            LoopOrder::LeftChild => pass.push_by_left_child(start, mid, end),
                            LoopOrder::RightChild => pass.push_by_right_child(start, mid, end),
                        }
                    }
                }
            }
        }
        for position in 0..len {
            pass.push_lexical(position);
        }

        debug!(
            "outside pass over {} tokens, log Z {}, expected rule applications {}",
            len,
            log_z,
            result.rule_counts.iter().sum::<f64>()
        );
        Ok(result)
    }

    #[inline]
    fn offset(&self, start: usize, end: usize) -> usize {
        debug_assert!(start < end && end <= self.sentence_len);
        let n = self.sentence_len;
        let cell = start * n - start * start.saturating_sub(1) / 2 + (end - start - 1);
        cell * self.num_nonterminals
    }

    fn entry(&self, scores: &[f64], sym: Symbol, start: usize, end: usize) -> f64 {
        assert!(
            start < end && end <= self.sentence_len,
            "span [{}, {}) is not within a sentence of {} tokens",
            start,
            end,
            self.sentence_len
        );
        if sym.usize() >= self.num_nonterminals {
            return f64::NEG_INFINITY;
        }
        scores[self.offset(start, end) + sym.usize()]
    }

    pub fn sentence_len(&self) -> usize {
        self.sentence_len
    }

    /// The total inside score of the sentence, or `None` if the grammar cannot derive it.
    pub fn log_z(&self) -> Option<f64> {
        self.log_z
    }

    pub fn inside(&self, sym: Symbol, start: usize, end: usize) -> f64 {
        self.entry(&self.inside, sym, start, end)
    }

    pub fn outside(&self, sym: Symbol, start: usize, end: usize) -> f64 {
        self.entry(&self.outside, sym, start, end)
    }

    /// The outside score of the token at `position`. With a parse, it equals the total inside
    /// score.
    pub fn terminal_outside(&self, position: usize) -> f64 {
        self.terminal_outside[position]
    }

    /// The posterior probability that `sym` spans `[start, end)`.
    pub fn marginal(&self, sym: Symbol, start: usize, end: usize) -> f64 {
        match self.log_z {
            Some(log_z) if log_z > f64::NEG_INFINITY => {
                let joint = self.inside(sym, start, end) + self.outside(sym, start, end);
                if joint == f64::NEG_INFINITY {
                    0.0
                } else {
                    (joint - log_z).exp()
                }
            }
            _ => 0.0,
        }
    }

    /// Symbols with a nonzero marginal over `[start, end)`.
    pub fn span_marginals(&self, start: usize, end: usize) -> Vec<(Symbol, f64)> {
        (0..self.num_nonterminals)
            .map(Symbol::from)
            .map(|sym| (sym, self.marginal(sym, start, end)))
            .filter(|&(_, marginal)| marginal > 0.0)
            .collect()
    }

    /// The expected number of applications of each rule, indexed by rule id.
    pub fn expected_rule_counts(&self) -> &[f64] {
        &self.rule_counts[..]
    }

    pub fn expected_rule_count(&self, id: RuleId) -> f64 {
        self.rule_counts[id.usize()]
    }
}

struct OutsidePass<'a, 'g, S: ?Sized> {
    grammar: &'g CnfGrammar,
    chart: &'a Chart<'g>,
    scorer: &'a S,
    log_z: f64,
    result: &'a mut InsideOutside,
}

impl<'a, 'g, S: Scorer + ?Sized> OutsidePass<'a, 'g, S> {
    /// Adds `score` to the outside score of `sym` over `[start, end)`.
    fn add_outside(&mut self, sym: Symbol, start: usize, end: usize, score: f64) {
        if sym == self.result.root && start == 0 && end == self.result.sentence_len {
            return;
        }
        let index = self.result.offset(start, end) + sym.usize();
        let entry = &mut self.result.outside[index];
        *entry = log_add(*entry, score);
    }

    fn add_count(&mut self, rule: &Rule, joint: f64) {
        if joint > f64::NEG_INFINITY {
            self.result.rule_counts[rule.id().usize()] += (joint - self.log_z).exp();
        }
    }

    fn outside_of(&self, sym: Symbol, start: usize, end: usize) -> f64 {
        self.result.outside[self.result.offset(start, end) + sym.usize()]
    }

    /// Walks unary chains top-down, so that each parent's outside score is complete before it is
    /// pushed to its children.
    fn push_unary(&mut self, start: usize, end: usize) {
        let grammar = self.grammar;
        let cell = self.chart.cell(start, end);
        for &child in grammar.unary_closure_order().iter().rev() {
            if !cell.contains(child) {
                continue;
            }
            let child_inside = cell.score(child);
            for &id in grammar.unary_rules_with_child(child) {
                let rule = grammar.rule(id);
                let parent_outside = self.outside_of(rule.parent(), start, end);
                if parent_outside == f64::NEG_INFINITY {
                    continue;
                }
                let score = parent_outside + self.scorer.score(rule, start, end, end);
                self.add_count(rule, score + child_inside);
                self.add_outside(child, start, end, score);
            }
        }
    }

    /// Pushes the outside score of `rule.parent()` over `[start, end)` to both children.
    fn push_binary(&mut self, rule: &Rule, start: usize, mid: usize, end: usize) {
        let parent_outside = self.outside_of(rule.parent(), start, end);
        if parent_outside == f64::NEG_INFINITY {
            return;
        }
        let left_sym = rule.left_child();
        let right_sym = match rule.right_child() {
            Some(right_sym) => right_sym,
            None => return,
        };
        let left_inside = self.chart.score(left_sym, start, mid);
        let right_inside = self.chart.score(right_sym, mid, end);
        let score = parent_outside + self.scorer.score(rule, start, mid, end);
        self.add_count(rule, score + left_inside + right_inside);
        self.add_outside(left_sym, start, mid, score + right_inside);
        self.add_outside(right_sym, mid, end, score + left_inside);
    }

    fn push_by_pairs(&mut self, start: usize, mid: usize, end: usize) {
        let grammar = self.grammar;
        let left = self.chart.cell(start, mid);
        let right = self.chart.cell(mid, end);
        for &left_sym in left.symbols_present() {
            if !grammar.is_left_child(left_sym) {
                continue;
            }
            for &right_sym in right.symbols_present() {
                if !grammar.is_right_child(right_sym) {
                    continue;
                }
                for &id in grammar.binary_rules_with_children(left_sym, right_sym) {
                    self.push_binary(grammar.rule(id), start, mid, end);
                }
            }
        }
    }

    fn push_by_left_child(&mut self, start: usize, mid: usize, end: usize) {
        let grammar = self.grammar;
        let left = self.chart.cell(start, mid);
        let right = self.chart.cell(mid, end);
        for &left_sym in left.symbols_present() {
            for &id in grammar.binary_rules_with_left_child(left_sym) {
                let rule = grammar.rule(id);
                if rule.right_child().map_or(false, |right_sym| right.contains(right_sym)) {
                    self.push_binary(rule, start, mid, end);
                }
            }
        }
    }

    fn push_by_right_child(&mut self, start: usize, mid: usize, end: usize) {
        let grammar = self.grammar;
        let left = self.chart.cell(start, mid);
        let right = self.chart.cell(mid, end);
        for &right_sym in right.symbols_present() {
            for &id in grammar.binary_rules_with_right_child(right_sym) {
                let rule = grammar.rule(id);
                if left.contains(rule.left_child()) {
                    self.push_binary(rule, start, mid, end);
                }
            }
        }
    }

    fn push_lexical(&mut self, position: usize) {
        let end = position + 1;
        let grammar = self.grammar;
        let token = self.chart.sentence()[position];
        let cell = self.chart.cell(position, end);
        let mut total = f64::NEG_INFINITY;
        for &id in grammar.lexical_rules_with_child(token) {
            let rule = grammar.rule(id);
            if !cell.contains(rule.parent()) {
                continue;
            }
            let parent_outside = self.outside_of(rule.parent(), position, end);
            if parent_outside == f64::NEG_INFINITY {
                continue;
            }
            let score = parent_outside + self.scorer.score(rule, position, position, end);
            self.add_count(rule, score);
            total = log_add(total, score);
        }
        self.result.terminal_outside[position] = total;
    }
}
