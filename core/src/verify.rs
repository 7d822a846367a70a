//! Element-wise comparison of two grids within a tolerance.

use crate::error::{ConvError, Result};
use crate::grid::Grid;
use tracing::{info, warn};

/// Absolute tolerance used by the CLI when comparing against a reference.
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// The first cell (in row-major order) whose difference exceeded the tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub expected: f32,
    pub actual: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Comparison {
    pub tolerance: f32,
    /// Largest absolute difference over all cells.
    pub max_diff: f32,
    pub mismatches: usize,
    pub first_mismatch: Option<Mismatch>,
}

impl Comparison {
    pub fn matches(&self) -> bool {
        self.mismatches == 0
    }

    /// Logs the outcome: `info` on a match, `warn` with the first offending cell otherwise.
    pub fn report(&self, label: &str) {
        match self.first_mismatch {
            None => info!(label, max_diff = self.max_diff, "results match"),
            Some(m) => warn!(
                label,
                mismatches = self.mismatches,
                max_diff = self.max_diff,
                row = m.row,
                col = m.col,
                expected = m.expected,
                actual = m.actual,
                "results differ"
            ),
        }
    }
}

/// Compares `actual` against `expected`, cell by cell.
///
/// A NaN on either side counts as a mismatch.
///
/// # Errors
///
/// Returns `ConvError::ShapeMismatch` if the grids have different shapes.
pub fn compare(expected: &Grid<f32>, actual: &Grid<f32>, tolerance: f32) -> Result<Comparison> {
    if expected.shape() != actual.shape() {
        return Err(ConvError::ShapeMismatch {
            expected: expected.shape().to_vec(),
            got: actual.shape().to_vec(),
        });
    }

    let cols = expected.cols().max(1);
    let mut result = Comparison {
        tolerance,
        max_diff: 0.0,
        mismatches: 0,
        first_mismatch: None,
    };
    for (idx, (&e, &a)) in expected.data().iter().zip(actual.data()).enumerate() {
        let diff = (e - a).abs();
        if diff.is_nan() || diff > tolerance {
            result.mismatches += 1;
            result.first_mismatch.get_or_insert(Mismatch {
                row: idx / cols,
                col: idx % cols,
                expected: e,
                actual: a,
            });
        }
        if diff > result.max_diff {
            result.max_diff = diff;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        let a = Grid::from_fn([3, 3], |i, j| (i * j) as f32);
        let c = compare(&a, &a, DEFAULT_TOLERANCE).unwrap();
        assert!(c.matches());
        assert_eq!(c.max_diff, 0.0);
        assert_eq!(c.first_mismatch, None);
    }

    #[test]
    fn test_within_tolerance() {
        let a = Grid::new(vec![1.0, 2.0], [1, 2]).unwrap();
        let b = Grid::new(vec![1.0 + 5e-6, 2.0], [1, 2]).unwrap();
        assert!(compare(&a, &b, DEFAULT_TOLERANCE).unwrap().matches());
    }

    #[test]
    fn test_first_mismatch_located() {
        let a = Grid::<f32>::zeros([3, 4]);
        let mut b = a.clone();
        b[(1, 2)] = 0.5;
        b[(2, 0)] = -2.0;

        let c = compare(&a, &b, DEFAULT_TOLERANCE).unwrap();
        assert!(!c.matches());
        assert_eq!(c.mismatches, 2);
        assert_eq!(c.max_diff, 2.0);
        assert_eq!(
            c.first_mismatch,
            Some(Mismatch {
                row: 1,
                col: 2,
                expected: 0.0,
                actual: 0.5
            })
        );
    }

    #[test]
    fn test_nan_is_mismatch() {
        let a = Grid::<f32>::zeros([1, 1]);
        let b = Grid::new(vec![f32::NAN], [1, 1]).unwrap();
        assert!(!compare(&a, &b, 1.0).unwrap().matches());
    }

    #[test]
    fn test_shape_mismatch() {
        let a = Grid::<f32>::zeros([2, 3]);
        let b = Grid::<f32>::zeros([3, 2]);
        assert!(matches!(
            compare(&a, &b, DEFAULT_TOLERANCE),
            Err(ConvError::ShapeMismatch { .. })
        ));
    }
}
