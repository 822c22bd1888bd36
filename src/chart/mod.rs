//! The chart: one cell per span of the sentence being parsed.
//!
//! Cells live in an arena sized for the longest sentence seen so far. Parsing a sentence that
//! fits reopens and clears only the cells it needs; a longer sentence reallocates the arena.

mod tree;

pub use self::tree::{ParseTree, ViterbiParse};

use log::debug;
use thiserror::Error;

use crate::cell::{
    BackPointer, ChartCell, DoubleHashedCell, FilteredCell, FullCell, HashedCell, JitterSource,
    TieBreakingCell,
};
use crate::constraint::SharedConstraint;
use crate::grammar::{CnfGrammar, LoopOrder};
use crate::semiring::ParseType;
use crate::symbol::Symbol;

/// The representation of chart cells.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CellType {
    /// [`FullCell`]: a dense array per cell.
    #[default]
    Full,
    /// [`HashedCell`]: one map per cell.
    Hashed,
    /// [`DoubleHashedCell`]: separate score and back pointer maps per cell.
    DoubleHashed,
    /// [`TieBreakingCell`]: dense, with random tie breaking. Viterbi only.
    TieBreaking,
}

impl CellType {
    /// Checks whether cells of this type can hold scores of the given semiring.
    pub fn supports(self, parse_type: ParseType) -> bool {
        !(self == CellType::TieBreaking && parse_type != ParseType::Viterbi)
    }
}

/// Chart configuration.
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ChartConfig {
    pub parse_type: ParseType,
    pub cell_type: CellType,
    /// Must match the loop order the grammar is indexed for.
    pub loop_order: LoopOrder,
}

impl ChartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse_type(mut self, parse_type: ParseType) -> Self {
        self.parse_type = parse_type;
        self
    }

    pub fn with_cell_type(mut self, cell_type: CellType) -> Self {
        self.cell_type = cell_type;
        self
    }

    pub fn with_loop_order(mut self, loop_order: LoopOrder) -> Self {
        self.loop_order = loop_order;
        self
    }
}

/// Errors reported by charts.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("{cell_type:?} cells do not support {parse_type:?} scores")]
    UnsupportedCombination {
        cell_type: CellType,
        parse_type: ParseType,
    },

    #[error("the chart needs binary rules indexed for {requested:?}, but they are indexed for {indexed:?}")]
    LoopOrderNotIndexed {
        requested: LoopOrder,
        indexed: LoopOrder,
    },

    #[error("tie-breaking cells need a jitter source")]
    MissingJitterSource,

    #[error("token {token} at position {position} is outside the alphabet of {num_terminals} terminals")]
    TokenOutOfRange {
        position: usize,
        token: usize,
        num_terminals: usize,
    },

    #[error("outside scores need a chart of inside scores, not {parse_type:?}")]
    NotAnInsideChart { parse_type: ParseType },
}

/// A chart over the spans of one sentence at a time.
pub struct Chart<'g> {
    grammar: &'g CnfGrammar,
    config: ChartConfig,
    jitter: Option<JitterSource>,
    constraint: Option<SharedConstraint>,
    /// Cells for all spans of up to `capacity` tokens, see `index`. A cell is `None` only while
    /// it is being filled.
    cells: Vec<Option<Box<dyn ChartCell>>>,
    capacity: usize,
    sentence: Vec<Symbol>,
}

impl<'g> Chart<'g> {
    /// Creates a chart. Fails if the configuration is not supported by the cell type or by the
    /// grammar's index, or if it asks for tie breaking.
    pub fn new(grammar: &'g CnfGrammar, config: ChartConfig) -> Result<Self, ChartError> {
        Self::build(grammar, config, None)
    }

    /// Creates a chart whose tie-breaking cells draw jitter from `jitter`.
    pub fn with_jitter(
        grammar: &'g CnfGrammar,
        config: ChartConfig,
        jitter: JitterSource,
    ) -> Result<Self, ChartError> {
        Self::build(grammar, config, Some(jitter))
    }

    fn build(
        grammar: &'g CnfGrammar,
        config: ChartConfig,
        jitter: Option<JitterSource>,
    ) -> Result<Self, ChartError> {
        if !config.cell_type.supports(config.parse_type) {
            return Err(ChartError::UnsupportedCombination {
                cell_type: config.cell_type,
                parse_type: config.parse_type,
            });
        }
        if grammar.loop_order() != config.loop_order {
            return Err(ChartError::LoopOrderNotIndexed {
                requested: config.loop_order,
                indexed: grammar.loop_order(),
            });
        }
        if config.cell_type == CellType::TieBreaking && jitter.is_none() {
            return Err(ChartError::MissingJitterSource);
        }
        Ok(Chart {
            grammar,
            config,
            jitter,
            constraint: None,
            cells: vec![],
            capacity: 0,
            sentence: vec![],
        })
    }

    /// Wraps every cell so that updates are filtered through `constraint`.
    pub fn with_constraint(mut self, constraint: SharedConstraint) -> Self {
        self.constraint = Some(constraint);
        // Cells are rebuilt with the filter on the next reset.
        self.cells.clear();
        self.capacity = 0;
        self
    }

    pub fn grammar(&self) -> &'g CnfGrammar {
        self.grammar
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn parse_type(&self) -> ParseType {
        self.config.parse_type
    }

    /// The sentence of the last reset.
    pub fn sentence(&self) -> &[Symbol] {
        &self.sentence[..]
    }

    pub fn sentence_len(&self) -> usize {
        self.sentence.len()
    }

    /// The length of the longest sentence the arena has room for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prepares the chart for a new sentence: reopens and clears the cells it needs, growing the
    /// arena if the sentence is longer than any before.
    pub fn reset(&mut self, sentence: &[Symbol]) -> Result<(), ChartError> {
        let num_terminals = self.grammar.num_terminals();
        if let Some((position, token)) = sentence
            .iter()
            .enumerate()
            .find(|&(_, token)| token.usize() >= num_terminals)
        {
            return Err(ChartError::TokenOutOfRange {
                position,
                token: token.usize(),
                num_terminals,
            });
        }
        let len = sentence.len();
        if len > self.capacity {
            debug!(
                "allocating chart for {} tokens ({} cells, {:?})",
                len,
                len * (len + 1) / 2,
                self.config.cell_type
            );
            self.capacity = len;
            let mut cells = Vec::with_capacity(len * (len + 1) / 2);
            for start in 0..len {
                for end in start + 1..=len {
                    cells.push(Some(self.make_cell(start, end)));
                }
            }
            self.cells = cells;
        } else {
            for start in 0..len {
                for end in start + 1..=len {
                    let index = self.index(start, end);
                    self.cell_mut_at(index).reset();
                }
            }
        }
        if let Some(ref constraint) = self.constraint {
            constraint.borrow_mut().set_sentence(sentence);
        }
        self.sentence.clear();
        self.sentence.extend_from_slice(sentence);
        Ok(())
    }

    fn make_cell(&self, start: usize, end: usize) -> Box<dyn ChartCell> {
        let num_nonterminals = self.grammar.num_nonterminals();
        let parse_type = self.config.parse_type;
        let cell: Box<dyn ChartCell> = match self.config.cell_type {
            CellType::Full => Box::new(FullCell::new(num_nonterminals, parse_type)),
            CellType::Hashed => Box::new(HashedCell::new(parse_type)),
            CellType::DoubleHashed => Box::new(DoubleHashedCell::new(parse_type)),
            CellType::TieBreaking => {
                let jitter = self
                    .jitter
                    .clone()
                    .expect("tie-breaking chart has a jitter source");
                Box::new(TieBreakingCell::new(num_nonterminals, jitter))
            }
        };
        match self.constraint {
            Some(ref constraint) => {
                Box::new(FilteredCell::new(cell, start, end, constraint.clone()))
            }
            None => cell,
        }
    }

    /// Position of the cell for `[start, end)` in the arena.
    #[inline]
    pub(crate) fn index(&self, start: usize, end: usize) -> usize {
        debug_assert!(start < end && end <= self.capacity, "span out of the chart");
        let row_offset = start * self.capacity - start * start.saturating_sub(1) / 2;
        row_offset + (end - start - 1)
    }

    #[inline]
    pub(crate) fn cell_at(&self, index: usize) -> &dyn ChartCell {
        self.cells[index]
            .as_deref()
            .expect("chart cell is being filled")
    }

    #[inline]
    fn cell_mut_at(&mut self, index: usize) -> &mut dyn ChartCell {
        self.cells[index]
            .as_deref_mut()
            .expect("chart cell is being filled")
    }

    /// Removes a cell from the arena so that it can be filled while its neighbours are read.
    pub(crate) fn take_cell(&mut self, index: usize) -> Box<dyn ChartCell> {
        self.cells[index]
            .take()
            .expect("chart cell is being filled")
    }

    pub(crate) fn put_cell(&mut self, index: usize, cell: Box<dyn ChartCell>) {
        self.cells[index] = Some(cell);
    }

    /// Returns the cell for the span `[start, end)` of the current sentence.
    ///
    /// # Panics
    ///
    /// Panics if the span is not within the current sentence.
    pub fn cell(&self, start: usize, end: usize) -> &dyn ChartCell {
        assert!(
            start < end && end <= self.sentence.len(),
            "span [{}, {}) is not within a sentence of {} tokens",
            start,
            end,
            self.sentence.len()
        );
        self.cell_at(self.index(start, end))
    }

    /// Returns the score of `sym` over `[start, end)`, or the semiring zero.
    pub fn score(&self, sym: Symbol, start: usize, end: usize) -> f64 {
        self.cell(start, end).score(sym)
    }

    pub fn back_pointer(&self, sym: Symbol, start: usize, end: usize) -> Option<BackPointer> {
        self.cell(start, end).back_pointer(sym)
    }

    /// Returns the score of the root over the whole sentence, or `None` if there is no parse.
    pub fn root_score(&self) -> Option<f64> {
        let len = self.sentence.len();
        if len == 0 {
            return None;
        }
        let cell = self.cell(0, len);
        let root = self.grammar.root();
        if cell.contains(root) {
            Some(cell.score(root))
        } else {
            None
        }
    }
}
