use super::{BackPointer, ChartCell};
use crate::constraint::SharedConstraint;
use crate::rule::Rule;
use crate::symbol::Symbol;

/// Wraps another cell and drops the updates a [`CellConstraint`] rejects.
///
/// [`CellConstraint`]: crate::constraint::CellConstraint
pub struct FilteredCell<C> {
    inner: C,
    start: usize,
    end: usize,
    constraint: SharedConstraint,
}

impl<C: ChartCell> FilteredCell<C> {
    /// Wraps the cell for span `[start, end)`.
    pub fn new(inner: C, start: usize, end: usize, constraint: SharedConstraint) -> Self {
        FilteredCell {
            inner,
            start,
            end,
            constraint,
        }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: ChartCell> ChartCell for FilteredCell<C> {
    fn update_cell(&mut self, mid: usize, rule: &Rule, score: f64) {
        let accepted = self
            .constraint
            .borrow()
            .should_update_cell(self.start, self.end, mid, rule, score);
        if accepted {
            self.inner.update_cell(mid, rule, score);
        } else {
            // Closed cells reject updates whatever the constraint says.
            assert!(!self.inner.is_closed(), "update of a closed chart cell");
        }
    }

    #[inline]
    fn score(&self, sym: Symbol) -> f64 {
        self.inner.score(sym)
    }

    #[inline]
    fn contains(&self, sym: Symbol) -> bool {
        self.inner.contains(sym)
    }

    fn back_pointer(&self, sym: Symbol) -> Option<BackPointer> {
        self.inner.back_pointer(sym)
    }

    fn symbols_present(&self) -> &[Symbol] {
        self.inner.symbols_present()
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn reset(&mut self) {
        self.inner.reset()
    }
}
