//! Thread scheduling for the local compute kernel.
//!
//! Every output cell is independent, so the tile can be split at any granularity without
//! changing a single bit of the result. The schedule only decides how much work each rayon task
//! gets.
//!
//! The `Auto` policy keeps per-task work roughly constant: larger grids get larger blocks of
//! rows, larger kernels get smaller ones.

use std::num::NonZeroUsize;

/// How a worker's output tile is split into rayon tasks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Schedule {
    /// Blocks of rows sized by [`block_rows`].
    #[default]
    Auto,
    /// Fixed blocks of this many output rows.
    Rows(NonZeroUsize),
    /// Row-major runs of this many output cells, ignoring row boundaries.
    Cells(NonZeroUsize),
}

impl Schedule {
    /// Number of output cells handed to each task for a tile of `local_rows x out_w`.
    ///
    /// Never zero, so a tile with fewer rows than threads still yields at least one task.
    pub fn chunk_cells(
        &self,
        out_h: usize,
        local_rows: usize,
        out_w: usize,
        taps: usize,
        threads: usize,
    ) -> usize {
        let cells = match self {
            Schedule::Auto => block_rows(out_h, local_rows, taps, threads) * out_w,
            Schedule::Rows(n) => n.get() * out_w,
            Schedule::Cells(n) => n.get(),
        };
        cells.max(1)
    }
}

/// Rows per task for the `Auto` schedule.
///
/// # Arguments
///
/// * `out_h` - Height of the full output grid (sets the base block size).
/// * `local_rows` - Rows in this worker's tile (caps the block so every thread gets work).
/// * `taps` - Kernel area `k_h * k_w`.
/// * `threads` - Threads in the worker's pool.
pub fn block_rows(out_h: usize, local_rows: usize, taps: usize, threads: usize) -> usize {
    let base = match out_h {
        0..=99 => 8,
        100..=499 => 16,
        500..=1999 => 32,
        _ => 64,
    };

    let mut block = match taps {
        0..=9 => base,
        10..=25 => (base / 2).max(2),
        26..=49 => (base / 3).max(1),
        _ => (base / 4).max(1),
    };

    if threads > 16 {
        block *= 2;
    }

    // Aim for at least two blocks per thread; with fewer rows than that, fall back to
    // single-row blocks so every row can go to its own thread.
    let threads = threads.max(1);
    let cap = local_rows / (threads * 2);
    if cap > 0 {
        block = block.min(cap);
    } else {
        block = block.min(local_rows / threads);
    }

    block.max(1)
}
