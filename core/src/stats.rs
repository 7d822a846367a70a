//! Per-call performance accounting.
//!
//! Timings are wall-clock and per worker. `communication` is always
//! `memory_copy + broadcast`; it is reported separately so callers can print the usual
//! compute/communication split without re-deriving it.

use std::fmt;
use std::time::{Duration, Instant};

/// What one worker spent during one call of
/// [`convolve_with_stats`](crate::convolve_with_stats).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerfStats {
    /// Whole call, from leaving the entry barrier to leaving the exit barrier.
    pub total: Duration,
    /// Local kernel over this worker's tile.
    pub computation: Duration,
    /// Staging this worker's halo rows.
    pub memory_copy: Duration,
    /// Reassembling the full output.
    pub broadcast: Duration,
    pub communication: Duration,
    /// Collectives issued during reassembly.
    pub num_communications: u64,
    /// Bytes staged plus bytes reassembled.
    pub bytes_transferred: u64,
    /// Cells of the full output grid.
    pub output_elements: u64,
}

impl PerfStats {
    /// Output cells per second of total time, or zero for an instantaneous call.
    pub fn throughput(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs > 0.0 {
            self.output_elements as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of total time spent computing, in percent.
    pub fn compute_fraction(&self) -> f64 {
        let total = self.total.as_secs_f64();
        if total > 0.0 {
            100.0 * self.computation.as_secs_f64() / total
        } else {
            0.0
        }
    }
}

impl fmt::Display for PerfStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total:          {:>12.6} s", self.total.as_secs_f64())?;
        writeln!(
            f,
            "computation:    {:>12.6} s ({:.1}%)",
            self.computation.as_secs_f64(),
            self.compute_fraction()
        )?;
        writeln!(f, "memory copy:    {:>12.6} s", self.memory_copy.as_secs_f64())?;
        writeln!(f, "broadcast:      {:>12.6} s", self.broadcast.as_secs_f64())?;
        writeln!(
            f,
            "communication:  {:>12.6} s",
            self.communication.as_secs_f64()
        )?;
        writeln!(f, "collectives:    {:>12}", self.num_communications)?;
        writeln!(f, "bytes moved:    {:>12}", self.bytes_transferred)?;
        write!(
            f,
            "throughput:     {:>12.0} cells/s",
            self.throughput()
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Compute,
    MemoryCopy,
    Broadcast,
}

/// Accumulates [`PerfStats`] during one call. When disabled, no clock is read and no counter
/// moves, so the instrumented and plain paths do the same work.
pub(crate) struct Recorder {
    enabled: bool,
    started: Option<Instant>,
    stats: PerfStats,
}

impl Recorder {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: None,
            stats: PerfStats::default(),
        }
    }

    pub(crate) fn start(&mut self) {
        if self.enabled {
            self.started = Some(Instant::now());
        }
    }

    /// Runs `f`, charging its wall time to `phase`.
    pub(crate) fn time<R>(&mut self, phase: Phase, f: impl FnOnce() -> R) -> R {
        if !self.enabled {
            return f();
        }
        let t0 = Instant::now();
        let result = f();
        let elapsed = t0.elapsed();
        match phase {
            Phase::Compute => self.stats.computation += elapsed,
            Phase::MemoryCopy => self.stats.memory_copy += elapsed,
            Phase::Broadcast => self.stats.broadcast += elapsed,
        }
        result
    }

    pub(crate) fn add_bytes(&mut self, bytes: usize) {
        if self.enabled {
            self.stats.bytes_transferred += bytes as u64;
        }
    }

    pub(crate) fn add_collectives(&mut self, n: usize) {
        if self.enabled {
            self.stats.num_communications += n as u64;
        }
    }

    pub(crate) fn set_output_elements(&mut self, n: usize) {
        if self.enabled {
            self.stats.output_elements = n as u64;
        }
    }

    pub(crate) fn finish(mut self) -> PerfStats {
        if let Some(t0) = self.started {
            self.stats.total = t0.elapsed();
        }
        self.stats.communication = self.stats.memory_copy + self.stats.broadcast;
        self.stats
    }
}
