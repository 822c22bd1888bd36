//! The CYK recurrence.
//!
//! Cells are filled bottom-up by span width. Width-one cells receive lexical rules for their
//! token; wider cells combine every pair of adjacent sub-spans through the grammar's binary
//! rules. Each cell is then closed under unary rules, children before parents, so that a
//! parent always reads the final score of its child, and is closed.

use log::{debug, trace};

use crate::cell::{ChartCell, JitterSource};
use crate::chart::{Chart, ChartConfig, ChartError, ViterbiParse};
use crate::grammar::{CnfGrammar, LoopOrder};
use crate::inside_outside::InsideOutside;
use crate::rule::RuleId;
use crate::scorer::{RuleScorer, Scorer};
use crate::symbol::Symbol;

impl<'g> Chart<'g> {
    /// Resets the chart for `sentence` and fills every cell.
    pub fn parse<S>(&mut self, sentence: &[Symbol], scorer: &S) -> Result<(), ChartError>
    where
        S: Scorer + ?Sized,
    {
        self.reset(sentence)?;
        let grammar = self.grammar();
        let loop_order = self.config().loop_order;
        let len = sentence.len();

        for width in 1..=len {
            for start in 0..=len - width {
                let end = start + width;
                let index = self.index(start, end);
                let mut cell = self.take_cell(index);

                if width == 1 {
                    let token = sentence[start];
                    for &id in grammar.lexical_rules_with_child(token) {
                        let rule = grammar.rule(id);
                        cell.update_cell(start, rule, scorer.score(rule, start, start, end));
                    }
                } else {
                    let combine = Combine { grammar, scorer, start, end };
                    for mid in start + 1..end {
                        let left = self.cell_at(self.index(start, mid));
                        let right = self.cell_at(self.index(mid, end));
                        match loop_order {
                            LoopOrder::CartesianProduct => {
                                combine.by_pairs(mid, left, right, &mut *cell)
                            }
                            LoopOrder::LeftChild => {
                                combine.by_left_child(mid, left, right, &mut *cell)
                            }
                            LoopOrder::RightChild => {
                                combine.by_right_child(mid, left, right, &mut *cell)
                            }
                        }
                    }
                }

                for &child in grammar.unary_closure_order() {
                    if !cell.contains(child) {
                        continue;
                    }
                    let child_score = cell.score(child);
                    for &id in grammar.unary_rules_with_child(child) {
                        let rule = grammar.rule(id);
                        let score = child_score + scorer.score(rule, start, end, end);
                        cell.update_cell(end, rule, score);
                    }
                }

                cell.close();
                trace!(
                    "closed cell [{}, {}) with {} symbols",
                    start,
                    end,
                    cell.symbols_present().len()
                );
                self.put_cell(index, cell);
            }
        }

        debug!(
            "filled {:?} chart for {} tokens, root score {:?}",
            self.parse_type(),
            len,
            self.root_score()
        );
        Ok(())
    }
}

/// Binary rule application for one parent span.
struct Combine<'a, S: ?Sized> {
    grammar: &'a CnfGrammar,
    scorer: &'a S,
    start: usize,
    end: usize,
}

impl<'a, S: Scorer + ?Sized> Combine<'a, S> {
    #[inline]
    fn offer(&self, parent: &mut dyn ChartCell, mid: usize, id: RuleId, children_score: f64) {
        let rule = self.grammar.rule(id);
        let score = children_score + self.scorer.score(rule, self.start, mid, self.end);
        parent.update_cell(mid, rule, score);
    }

    /// Every present left symbol against every present right symbol.
    fn by_pairs(
        &self,
        mid: usize,
        left: &dyn ChartCell,
        right: &dyn ChartCell,
        parent: &mut dyn ChartCell,
    ) {
        for &left_sym in left.symbols_present() {
            if !self.grammar.is_left_child(left_sym) {
                continue;
            }
            let left_score = left.score(left_sym);
            for &right_sym in right.symbols_present() {
                if !self.grammar.is_right_child(right_sym) {
                    continue;
                }
                let rules = self.grammar.binary_rules_with_children(left_sym, right_sym);
                if rules.is_empty() {
                    continue;
                }
                let children_score = left_score + right.score(right_sym);
                for &id in rules {
                    self.offer(parent, mid, id, children_score);
                }
            }
        }
    }

    fn by_left_child(
        &self,
        mid: usize,
        left: &dyn ChartCell,
        right: &dyn ChartCell,
        parent: &mut dyn ChartCell,
    ) {
        for &left_sym in left.symbols_present() {
            let left_score = left.score(left_sym);
            for &id in self.grammar.binary_rules_with_left_child(left_sym) {
                let right_sym = match self.grammar.rule(id).right_child() {
                    Some(right_sym) if right.contains(right_sym) => right_sym,
                    _ => continue,
                };
                self.offer(parent, mid, id, left_score + right.score(right_sym));
            }
        }
    }

    fn by_right_child(
        &self,
        mid: usize,
        left: &dyn ChartCell,
        right: &dyn ChartCell,
        parent: &mut dyn ChartCell,
    ) {
        for &right_sym in right.symbols_present() {
            let right_score = right.score(right_sym);
            for &id in self.grammar.binary_rules_with_right_child(right_sym) {
                let left_sym = self.grammar.rule(id).left_child();
                if !left.contains(left_sym) {
                    continue;
                }
                self.offer(parent, mid, id, left.score(left_sym) + right_score);
            }
        }
    }
}

/// Owns a chart and a scorer, and parses one sentence at a time.
pub struct CkyParser<'g, S = RuleScorer> {
    chart: Chart<'g>,
    scorer: S,
}

impl<'g> CkyParser<'g> {
    /// Creates a parser that scores rules by their static scores.
    pub fn new(grammar: &'g CnfGrammar, config: ChartConfig) -> Result<Self, ChartError> {
        Ok(CkyParser {
            chart: Chart::new(grammar, config)?,
            scorer: RuleScorer,
        })
    }

    /// Creates a parser with tie-breaking support.
    pub fn with_jitter(
        grammar: &'g CnfGrammar,
        config: ChartConfig,
        jitter: JitterSource,
    ) -> Result<Self, ChartError> {
        Ok(CkyParser {
            chart: Chart::with_jitter(grammar, config, jitter)?,
            scorer: RuleScorer,
        })
    }
}

impl<'g, S: Scorer> CkyParser<'g, S> {
    /// Replaces the scorer.
    pub fn with_scorer<T: Scorer>(self, scorer: T) -> CkyParser<'g, T> {
        CkyParser {
            chart: self.chart,
            scorer,
        }
    }

    pub fn chart(&self) -> &Chart<'g> {
        &self.chart
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Fills the chart for `sentence`.
    pub fn parse(&mut self, sentence: &[Symbol]) -> Result<&Chart<'g>, ChartError> {
        self.chart.parse(sentence, &self.scorer)?;
        Ok(&self.chart)
    }

    /// Finds the best derivation of `sentence`, or `None` if there is none.
    pub fn viterbi_parse(&mut self, sentence: &[Symbol]) -> Result<Option<ViterbiParse>, ChartError> {
        self.chart.parse(sentence, &self.scorer)?;
        Ok(self.chart.viterbi_parse())
    }

    /// Runs the inside and outside passes over `sentence`. The chart must hold inside scores.
    pub fn inside_outside(&mut self, sentence: &[Symbol]) -> Result<InsideOutside, ChartError> {
        self.chart.parse(sentence, &self.scorer)?;
        InsideOutside::new(&self.chart, &self.scorer)
    }
}
