use haloconv_kernels::Schedule;
use std::num::NonZeroUsize;

/// Step between consecutive output samples, in input cells.
///
/// Zero strides are representable so they can be reported as invalid input by
/// [`convolve`](crate::convolve) rather than rejected at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stride {
    pub rows: usize,
    pub cols: usize,
}

impl Stride {
    pub const UNIT: Stride = Stride { rows: 1, cols: 1 };

    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub(crate) const fn as_array(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }
}

impl Default for Stride {
    fn default() -> Self {
        Self::UNIT
    }
}

impl From<[usize; 2]> for Stride {
    fn from([rows, cols]: [usize; 2]) -> Self {
        Self { rows, cols }
    }
}

/// How workers combine their tiles into the full output.
///
/// Both policies produce identical grids; they differ in the number of collectives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reassembly {
    /// One variable-count all-gather of every tile.
    #[default]
    AllGather,
    /// One broadcast per output row, rooted at the row's owner.
    BroadcastRows,
}

/// Per-call knobs for [`convolve`](crate::convolve). Every worker of a group must pass the same
/// configuration.
///
/// ```rust
/// use haloconv::{ConvConfig, Reassembly, Schedule};
///
/// let config = ConvConfig::default()
///     .with_threads(4)
///     .with_reassembly(Reassembly::BroadcastRows)
///     .with_schedule(Schedule::Auto);
/// assert_eq!(config.threads().map(|n| n.get()), Some(4));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvConfig {
    threads: Option<NonZeroUsize>,
    schedule: Schedule,
    reassembly: Reassembly,
}

impl ConvConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of compute threads per worker. `0` means the rayon default.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = NonZeroUsize::new(threads);
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_reassembly(mut self, reassembly: Reassembly) -> Self {
        self.reassembly = reassembly;
        self
    }

    /// Threads per worker, or `None` for the global rayon pool.
    pub fn threads(&self) -> Option<NonZeroUsize> {
        self.threads
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn reassembly(&self) -> Reassembly {
        self.reassembly
    }
}
