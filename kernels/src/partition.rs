//! Row range partitioner.
//!
//! Output rows are dealt out in contiguous blocks of `ceil(out_h / worker_count)` rows:
//!
//! ```text
//! out_h = 10, worker_count = 4  ->  rows_per_worker = 3
//!
//! worker 0: [0, 3)   worker 1: [3, 6)   worker 2: [6, 9)   worker 3: [9, 10)
//! ```
//!
//! When there are more workers than rows the trailing workers get an empty range. That is an
//! expected state, not an error: those workers still take part in every collective.

use std::ops::Range;

/// Returns the output rows owned by `worker_id`.
///
/// # Arguments
///
/// * `out_h` - Total number of output rows.
/// * `worker_count` - Size of the worker group (must be non-zero).
/// * `worker_id` - Rank of the worker, `0..worker_count`.
///
/// # Panics
///
/// Panics if `worker_count` is zero.
pub fn row_range(out_h: usize, worker_count: usize, worker_id: usize) -> Range<usize> {
    assert!(worker_count > 0, "worker_count must be non-zero");
    let rows_per_worker = out_h.div_ceil(worker_count);
    let lo = worker_id.saturating_mul(rows_per_worker).min(out_h);
    let hi = lo.saturating_add(rows_per_worker).min(out_h);
    lo..hi
}

/// Iterates over the row ranges of every worker, in rank order.
pub fn row_ranges(out_h: usize, worker_count: usize) -> impl Iterator<Item = Range<usize>> {
    (0..worker_count).map(move |worker_id| row_range(out_h, worker_count, worker_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_even_split() {
        let ranges: Vec<_> = row_ranges(12, 4).collect();
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..12]);
    }

    #[test]
    fn test_uneven_split() {
        let ranges: Vec<_> = row_ranges(10, 4).collect();
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn test_more_workers_than_rows() {
        // ceil(3 / 4) = 1 row each; the last worker is left empty.
        let ranges: Vec<_> = row_ranges(3, 4).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..3, 3..3]);
        assert!(ranges[3].is_empty());

        // 8 workers over 3 rows leaves five empty ranges.
        let empty = row_ranges(3, 8).filter(|r| r.is_empty()).count();
        assert_eq!(empty, 5);
    }

    #[test]
    fn test_single_worker_owns_everything() {
        assert_eq!(row_range(7, 1, 0), 0..7);
    }

    #[test]
    fn test_empty_range_for_overshooting_rank() {
        // ceil(5 / 3) = 2: worker 2 starts at row 4, a worker 3 would start past the end.
        assert_eq!(row_range(5, 3, 2), 4..5);
        let r = row_range(2, 5, 4);
        assert_eq!(r.start, r.end);
    }

    #[test]
    #[should_panic(expected = "worker_count must be non-zero")]
    fn test_zero_workers_panics() {
        let _ = row_range(4, 0, 0);
    }

    proptest! {
        #[test]
        fn prop_ranges_tile_output(out_h in 0usize..300, workers in 1usize..40) {
            let mut next = 0;
            for range in row_ranges(out_h, workers) {
                // Contiguous, disjoint and in order: each range starts where the last ended,
                // or is an empty range parked at the end.
                if range.is_empty() {
                    prop_assert_eq!(range.start, out_h);
                } else {
                    prop_assert_eq!(range.start, next);
                    next = range.end;
                }
                prop_assert!(range.end <= out_h);
            }
            prop_assert_eq!(next, out_h);
        }
    }
}
