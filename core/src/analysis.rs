//! Thread-count scaling analysis for a single worker.

use crate::config::Stride;
use crate::error::{ConvError, Result};
use crate::grid::Grid;
use crate::reference;
use haloconv_kernels::{ConvGeometry, Schedule};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One measured thread count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepPoint {
    pub threads: usize,
    pub elapsed: Duration,
    /// Baseline time over this time.
    pub speedup: f64,
    /// Speedup per thread, in percent.
    pub efficiency: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepReport {
    /// Measured points, by increasing thread count.
    pub points: Vec<SweepPoint>,
    /// Thread counts whose run could not get its resources.
    pub skipped: Vec<usize>,
}

impl SweepReport {
    /// The fastest measured point.
    pub fn best(&self) -> Option<&SweepPoint> {
        self.points.iter().min_by_key(|p| p.elapsed)
    }
}

/// Times the threaded single-worker correlation for every thread count in `1..=max_threads`.
///
/// Each count gets one untimed warm-up run and one timed run. Speedup is relative to the first
/// measured count, normally one thread. A count whose buffers or pool cannot be created is
/// logged and skipped; the sweep carries on with the next one.
///
/// # Errors
///
/// Returns `ConvError::InvalidInput` before running anything if the stride, kernel or input
/// is invalid.
pub fn thread_sweep(
    input: &Grid<f32>,
    kernel: &Grid<f32>,
    stride: Stride,
    max_threads: NonZeroUsize,
    schedule: Schedule,
) -> Result<SweepReport> {
    ConvGeometry::new(input.shape(), kernel.shape(), stride.as_array())?;

    let mut report = SweepReport::default();
    let mut baseline: Option<Duration> = None;

    for threads in 1..=max_threads.get() {
        let n = NonZeroUsize::new(threads);
        let run = || reference::threaded(input, kernel, stride, n, schedule);

        let timed = run().and_then(|_| {
            let t0 = Instant::now();
            run()?;
            Ok(t0.elapsed())
        });
        let elapsed = match timed {
            Ok(elapsed) => elapsed,
            Err(e @ (ConvError::Allocation { .. } | ConvError::ThreadPool(_))) => {
                warn!(threads, error = %e, "skipping thread count");
                report.skipped.push(threads);
                continue;
            }
            Err(e) => return Err(e),
        };

        let base = *baseline.get_or_insert(elapsed);
        let speedup = ratio(base, elapsed);
        let point = SweepPoint {
            threads,
            elapsed,
            speedup,
            efficiency: 100.0 * speedup / threads as f64,
        };
        debug!(threads, ?elapsed, speedup, "sweep point");
        report.points.push(point);
    }
    Ok(report)
}

fn ratio(base: Duration, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        base.as_secs_f64() / secs
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random;

    #[test]
    fn test_sweep_covers_every_count() {
        let input = random::generate([64, 64], Some(1));
        let kernel = random::generate([3, 3], Some(2));
        let report = thread_sweep(
            &input,
            &kernel,
            Stride::UNIT,
            NonZeroUsize::new(3).unwrap(),
            Schedule::Auto,
        )
        .unwrap();

        assert!(report.skipped.is_empty());
        let counts: Vec<usize> = report.points.iter().map(|p| p.threads).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert_eq!(report.points[0].speedup, 1.0);
        assert_eq!(report.points[0].efficiency, 100.0);
        assert!(report.best().is_some());
    }

    #[test]
    fn test_sweep_rejects_invalid_stride() {
        let input = Grid::<f32>::zeros([8, 8]);
        let kernel = Grid::<f32>::zeros([3, 3]);
        let err = thread_sweep(
            &input,
            &kernel,
            Stride::new(0, 0),
            NonZeroUsize::new(2).unwrap(),
            Schedule::Auto,
        )
        .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_ratio() {
        assert_eq!(
            ratio(Duration::from_millis(10), Duration::from_millis(5)),
            2.0
        );
        assert_eq!(ratio(Duration::from_millis(10), Duration::ZERO), 1.0);
    }

    #[test]
    fn test_best_is_fastest() {
        let point = |threads, ms| SweepPoint {
            threads,
            elapsed: Duration::from_millis(ms),
            speedup: 1.0,
            efficiency: 100.0,
        };
        let report = SweepReport {
            points: vec![point(1, 30), point(2, 10), point(3, 20)],
            skipped: vec![],
        };
        assert_eq!(report.best().map(|p| p.threads), Some(2));
    }
}
