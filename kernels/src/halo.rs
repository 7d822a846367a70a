//! Halo resolver and staged input slices.
//!
//! A worker that owns output rows `[lo, hi)` reads input rows
//!
//! ```text
//! [max(0, lo * s_h - pad_top), min(in_h, (hi - 1) * s_h + k_h - pad_top))
//! ```
//!
//! The extra rows above and below its "own" sampling rows are the halo. Only those rows are
//! staged into the worker's local buffer; the compute kernel then addresses the buffer through
//! an [`InputSlice`], which translates global row indices back to local ones.

use crate::geometry::ConvGeometry;
use crate::{KernelError, Result};
use std::ops::Range;

/// Returns the input rows needed to compute output rows `rows`, or `None` for an empty range.
///
/// The result never extends outside `[0, in_h)`.
pub fn halo_rows(rows: Range<usize>, geometry: &ConvGeometry) -> Option<Range<usize>> {
    if rows.is_empty() {
        return None;
    }
    let first = geometry.input_rows_for(rows.start);
    let last = geometry.input_rows_for(rows.end - 1);
    Some(first.start..last.end)
}

/// A read-only window of consecutive input rows, addressed in global coordinates.
///
/// # Layout
///
/// `data` holds `rows.len()` rows of `cols` elements each, row-major. `rows.start` is the
/// global index of the first stored row, so global row `i` lives at
/// `data[(i - rows.start) * cols..][..cols]`.
#[derive(Clone, Debug)]
pub struct InputSlice<'a, T> {
    data: &'a [T],
    rows: Range<usize>,
    cols: usize,
}

impl<'a, T> InputSlice<'a, T> {
    /// Wraps a staged halo buffer whose first row is global row `first_row`.
    ///
    /// # Errors
    ///
    /// Returns `KernelError::ShapeMismatch` if `data.len()` is not a multiple of `cols`.
    pub fn new(data: &'a [T], first_row: usize, cols: usize) -> Result<Self> {
        if cols == 0 || data.len() % cols != 0 {
            return Err(KernelError::ShapeMismatch {
                expected: vec![cols],
                got: vec![data.len()],
            });
        }
        let n_rows = data.len() / cols;
        Ok(Self {
            data,
            rows: first_row..first_row + n_rows,
            cols,
        })
    }

    /// Aliases a full input grid (no staging copy).
    pub fn whole(data: &'a [T], cols: usize) -> Result<Self> {
        Self::new(data, 0, cols)
    }

    /// Global row indices held by this slice.
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns global row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is outside [`Self::rows`].
    pub fn row(&self, i: usize) -> &'a [T] {
        assert!(
            self.rows.contains(&i),
            "row {} outside staged halo {:?}",
            i,
            self.rows
        );
        let local = i - self.rows.start;
        &self.data[local * self.cols..(local + 1) * self.cols]
    }

    /// Checks that this slice holds every row in `need`.
    pub fn ensure_covers(&self, need: &Range<usize>) -> Result<()> {
        if need.is_empty() || (self.rows.start <= need.start && need.end <= self.rows.end) {
            Ok(())
        } else {
            Err(KernelError::HaloTooSmall {
                have: self.rows.clone(),
                need: need.clone(),
            })
        }
    }
}
