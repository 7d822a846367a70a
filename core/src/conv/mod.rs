//! # Distributed convolution
//!
//! Every worker of a group calls [`convolve`] with the same arguments. The output rows are
//! split into contiguous blocks, one per worker, and each worker:
//!
//! 1.  validates the call (before any communication, so an invalid call fails everywhere
//!     without touching the network);
//! 2.  waits at the entry barrier;
//! 3.  allocates its output buffer and stages the input rows its block reads (its *halo*),
//!     or borrows the whole input when it is alone;
//! 4.  computes its block with a rayon pool;
//! 5.  votes on whether steps 3 and 4 succeeded, aborting with the whole group if any worker
//!     failed;
//! 6.  reassembles the full output from every worker's block;
//! 7.  waits at the exit barrier.
//!
//! The result is bitwise identical for any number of workers and any number of threads.

mod reassemble;
mod replicate;
mod stage;

pub use replicate::replicate;

use crate::config::{ConvConfig, Stride};
use crate::distributed::CollectiveBackend;
use crate::error::{ConvError, Result};
use crate::grid::{try_zeroed, Grid};
use crate::stats::{PerfStats, Phase, Recorder};
use haloconv_kernels::{cpu_conv2d_rows, halo_rows, row_range, ConvGeometry};
use rayon::{ThreadPool, ThreadPoolBuilder};
use reassemble::reassemble;
use stage::Staged;
use std::num::NonZeroUsize;
use std::ops::Range;
use tracing::{debug, debug_span, warn};

/// Computes the same-padded, strided correlation of `input` with `kernel` across the group.
///
/// Returns the full `ceil(H / stride.rows) x ceil(W / stride.cols)` output on every worker.
///
/// # Errors
///
/// - `ConvError::InvalidInput` for a zero stride, an empty kernel or an empty input. Raised
///   before any collective.
/// - `ConvError::Allocation` or `ConvError::ThreadPool` on a worker whose local phase failed,
///   and `ConvError::GroupAborted` on every other worker.
/// - `ConvError::Disconnected` / `ConvError::Protocol` if the group itself breaks down.
///
/// ```rust
/// use haloconv::{convolve, spawn_group, ConvConfig, Grid, Stride};
///
/// let input = Grid::<f32>::from_fn([6, 6], |i, j| (i * 6 + j) as f32);
/// let mut kernel = Grid::<f32>::zeros([3, 3]);
/// kernel[(1, 1)] = 1.0;
///
/// let outputs = spawn_group(3, |backend| {
///     convolve(&backend, &input, &kernel, Stride::UNIT, &ConvConfig::default())
/// })
/// .unwrap();
/// for output in outputs {
///     assert_eq!(output.unwrap(), input);
/// }
/// ```
pub fn convolve<B: CollectiveBackend + ?Sized>(
    backend: &B,
    input: &Grid<f32>,
    kernel: &Grid<f32>,
    stride: Stride,
    config: &ConvConfig,
) -> Result<Grid<f32>> {
    run(backend, input, kernel, stride, config, false).map(|(output, _)| output)
}

/// [`convolve`], also returning this worker's [`PerfStats`].
///
/// The numeric result is identical to [`convolve`]; only clock samples and counters are added.
pub fn convolve_with_stats<B: CollectiveBackend + ?Sized>(
    backend: &B,
    input: &Grid<f32>,
    kernel: &Grid<f32>,
    stride: Stride,
    config: &ConvConfig,
) -> Result<(Grid<f32>, PerfStats)> {
    run(backend, input, kernel, stride, config, true)
}

fn run<B: CollectiveBackend + ?Sized>(
    backend: &B,
    input: &Grid<f32>,
    kernel: &Grid<f32>,
    stride: Stride,
    config: &ConvConfig,
    instrument: bool,
) -> Result<(Grid<f32>, PerfStats)> {
    let geometry = ConvGeometry::new(input.shape(), kernel.shape(), stride.as_array())?;

    let rank = backend.rank();
    let world_size = backend.world_size();
    let (out_h, out_w) = (geometry.out_h(), geometry.out_w());
    let rows = row_range(out_h, world_size, rank);
    let halo = halo_rows(rows.clone(), &geometry);

    let span = debug_span!("convolve", rank, world_size);
    let _guard = span.enter();
    debug!(?rows, ?halo, out_h, out_w, "assigned rows");

    let mut recorder = Recorder::new(instrument);
    backend.barrier()?;
    recorder.start();
    recorder.set_output_elements(out_h * out_w);

    let local = compute_local(
        input,
        kernel,
        &geometry,
        rows,
        halo,
        config,
        world_size == 1,
        &mut recorder,
    );
    if let Err(e) = &local {
        warn!(error = %e, "local phase failed, aborting group");
    }
    let agreed = backend.all_agree(local.is_ok())?;
    let mut output = match local {
        Err(e) => return Err(e),
        Ok(_) if !agreed => {
            warn!("peer failed, aborting");
            return Err(ConvError::GroupAborted);
        }
        Ok(buf) => buf,
    };

    if world_size > 1 {
        let issued = recorder.time(Phase::Broadcast, || {
            reassemble(backend, config.reassembly(), &mut output, out_h, out_w)
        })?;
        recorder.add_collectives(issued);
        recorder.add_bytes(std::mem::size_of_val(output.as_slice()));
    }

    backend.barrier()?;
    let stats = recorder.finish();
    debug!(elapsed = ?stats.total, "done");
    Ok((Grid::new(output, [out_h, out_w])?, stats))
}

/// Allocates the output, stages the halo and computes this worker's rows into it.
#[allow(clippy::too_many_arguments)]
fn compute_local(
    input: &Grid<f32>,
    kernel: &Grid<f32>,
    geometry: &ConvGeometry,
    rows: Range<usize>,
    halo: Option<Range<usize>>,
    config: &ConvConfig,
    alias: bool,
    recorder: &mut Recorder,
) -> Result<Vec<f32>> {
    let out_w = geometry.out_w();
    let mut output = try_zeroed::<f32>(geometry.out_h() * out_w)?;

    let staged = recorder.time(Phase::MemoryCopy, || Staged::stage(input, halo, alias))?;
    recorder.add_bytes(staged.copied_bytes());

    let Some(slice) = staged.slice(input.cols())? else {
        return Ok(output);
    };
    let pool = build_pool(config.threads())?;
    let tile = &mut output[rows.start * out_w..rows.end * out_w];
    recorder.time(Phase::Compute, || {
        install(pool.as_ref(), || {
            cpu_conv2d_rows(
                &slice,
                kernel.data(),
                geometry,
                rows,
                config.schedule(),
                tile,
            )
        })
    })?;
    Ok(output)
}

/// A dedicated pool when a thread count is requested, otherwise the global one.
pub(crate) fn build_pool(threads: Option<NonZeroUsize>) -> Result<Option<ThreadPool>> {
    threads
        .map(|n| {
            ThreadPoolBuilder::new()
                .num_threads(n.get())
                .thread_name(|i| format!("haloconv-compute-{}", i))
                .build()
        })
        .transpose()
        .map_err(ConvError::from)
}

pub(crate) fn install<R: Send>(pool: Option<&ThreadPool>, f: impl FnOnce() -> R + Send) -> R {
    match pool {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::spawn_group;
    use crate::Reassembly;
    use haloconv_kernels::cpu_conv2d_serial;

    fn reference(input: &Grid<f32>, kernel: &Grid<f32>, stride: Stride) -> Vec<f32> {
        let geometry =
            ConvGeometry::new(input.shape(), kernel.shape(), stride.as_array()).unwrap();
        cpu_conv2d_serial(input.data(), kernel.data(), &geometry).unwrap()
    }

    #[test]
    fn test_single_worker_matches_reference() {
        let input = Grid::from_fn([7, 5], |i, j| ((i * 5 + j) % 11) as f32 - 5.0);
        let kernel = Grid::from_fn([3, 3], |i, j| (i as f32 - j as f32) * 0.5);
        let stride = Stride::new(2, 1);

        let out = spawn_group(1, |backend| {
            convolve(&backend, &input, &kernel, stride, &ConvConfig::default())
        })
        .unwrap()
        .pop()
        .unwrap()
        .unwrap();
        assert_eq!(out.shape(), [4, 5]);
        assert_eq!(out.data(), reference(&input, &kernel, stride).as_slice());
    }

    #[test]
    fn test_idle_workers_complete() {
        // Three output rows, eight workers: five of them own nothing.
        let input = Grid::from_fn([3, 4], |i, j| (i + j) as f32);
        let kernel = Grid::from_fn([3, 3], |_, _| 1.0);
        let expected = reference(&input, &kernel, Stride::UNIT);

        for policy in [Reassembly::AllGather, Reassembly::BroadcastRows] {
            let config = ConvConfig::default().with_reassembly(policy);
            let outputs = spawn_group(8, |backend| {
                convolve(&backend, &input, &kernel, Stride::UNIT, &config)
            })
            .unwrap();
            for out in outputs {
                assert_eq!(out.unwrap().data(), expected.as_slice());
            }
        }
    }

    #[test]
    fn test_build_pool() {
        assert!(build_pool(None).unwrap().is_none());
        let pool = build_pool(NonZeroUsize::new(3)).unwrap().unwrap();
        assert_eq!(install(Some(&pool), rayon::current_num_threads), 3);
    }
}
