use crate::geometry::ConvGeometry;
use crate::halo::{halo_rows, InputSlice};
use crate::schedule::Schedule;
use crate::{KernelElem, KernelError, Result};
use rayon::prelude::*;
use std::ops::Range;

/// Computes one worker's tile of a strided "same"-padded 2D correlation on CPU.
///
/// Fills output rows `rows` (all `out_w` columns) from a staged input slice. The work is
/// spread across the current rayon pool; install a sized pool around the call to control the
/// thread count.
///
/// # Arguments
///
/// * `input` - Staged input rows in global coordinates. Must cover `halo_rows(rows)`.
/// * `kernel` - Kernel data (flattened). Shape: `[k_h, k_w]`
/// * `geometry` - Dimensions, stride and padding of the call.
/// * `rows` - Output rows to compute.
/// * `schedule` - Task granularity. Does not affect the result.
/// * `out` - Destination tile (flattened). Shape: `[rows.len(), out_w]`
///
/// # Numerics
///
/// Each cell is `sum_{ki, kj} input[i + ki - pad_top][j + kj - pad_left] * kernel[ki][kj]`
/// accumulated in `T`, row-major over `(ki, kj)`, skipping taps that fall in the padding.
/// The order is fixed per cell, so any schedule and any thread count give identical bits.
pub fn cpu_conv2d_rows<T: KernelElem>(
    input: &InputSlice<'_, T>,
    kernel: &[T],
    geometry: &ConvGeometry,
    rows: Range<usize>,
    schedule: Schedule,
    out: &mut [T],
) -> Result<()> {
    let out_w = geometry.out_w();

    if input.cols() != geometry.in_w() {
        return Err(KernelError::ShapeMismatch {
            expected: vec![geometry.in_w()],
            got: vec![input.cols()],
        });
    }
    if kernel.len() != geometry.taps() {
        return Err(KernelError::ShapeMismatch {
            expected: vec![geometry.k_h(), geometry.k_w()],
            got: vec![kernel.len()],
        });
    }
    if rows.end > geometry.out_h() {
        return Err(KernelError::ShapeMismatch {
            expected: vec![geometry.out_h()],
            got: vec![rows.end],
        });
    }
    if out.len() != rows.len() * out_w {
        return Err(KernelError::ShapeMismatch {
            expected: vec![rows.len(), out_w],
            got: vec![out.len()],
        });
    }
    let Some(need) = halo_rows(rows.clone(), geometry) else {
        return Ok(());
    };
    input.ensure_covers(&need)?;

    let chunk = schedule.chunk_cells(
        geometry.out_h(),
        rows.len(),
        out_w,
        geometry.taps(),
        rayon::current_num_threads(),
    );

    // Chunks are runs of the flattened tile, so a chunk may start or end mid-row.
    out.par_chunks_mut(chunk)
        .enumerate()
        .for_each(|(chunk_idx, chunk_out)| {
            let first = chunk_idx * chunk;
            for (offset, cell) in chunk_out.iter_mut().enumerate() {
                let idx = first + offset;
                let out_i = rows.start + idx / out_w;
                let out_j = idx % out_w;
                *cell = correlate_cell(input, kernel, geometry, out_i, out_j);
            }
        });

    Ok(())
}

/// One output cell. Taps in the zero padding contribute nothing and are never read.
#[inline]
fn correlate_cell<T: KernelElem>(
    input: &InputSlice<'_, T>,
    kernel: &[T],
    geometry: &ConvGeometry,
    out_i: usize,
    out_j: usize,
) -> T {
    let i = out_i * geometry.stride_h();
    let j = out_j * geometry.stride_w();
    let k_w = geometry.k_w();

    let mut sum = T::zero();
    for (ki, kernel_row) in kernel.chunks_exact(k_w).enumerate() {
        let Some(input_i) = (i + ki).checked_sub(geometry.pad_top()) else {
            continue;
        };
        if input_i >= geometry.in_h() {
            break;
        }
        let input_row = input.row(input_i);

        for (kj, &weight) in kernel_row.iter().enumerate() {
            let Some(input_j) = (j + kj).checked_sub(geometry.pad_left()) else {
                continue;
            };
            if input_j >= geometry.in_w() {
                break;
            }
            sum += input_row[input_j] * weight;
        }
    }
    sum
}

/// Single-threaded reference implementation of the same correlation.
///
/// Written independently of [`cpu_conv2d_rows`] (plain index arithmetic, no slices, no
/// scheduling) so the two can check each other.
///
/// # Returns
///
/// A flattened vector of shape `[out_h, out_w]`.
pub fn cpu_conv2d_serial<T: KernelElem>(
    input: &[T],
    kernel: &[T],
    geometry: &ConvGeometry,
) -> Result<Vec<T>> {
    let in_h = geometry.in_h();
    let in_w = geometry.in_w();
    let k_h = geometry.k_h();
    let k_w = geometry.k_w();

    if input.len() != in_h * in_w {
        return Err(KernelError::ShapeMismatch {
            expected: vec![in_h, in_w],
            got: vec![input.len()],
        });
    }
    if kernel.len() != k_h * k_w {
        return Err(KernelError::ShapeMismatch {
            expected: vec![k_h, k_w],
            got: vec![kernel.len()],
        });
    }

    let out_h = geometry.out_h();
    let out_w = geometry.out_w();
    let pad_top = geometry.pad_top() as isize;
    let pad_left = geometry.pad_left() as isize;

    let mut output = vec![T::zero(); out_h * out_w];
    for out_i in 0..out_h {
        for out_j in 0..out_w {
            let i = (out_i * geometry.stride_h()) as isize;
            let j = (out_j * geometry.stride_w()) as isize;

            let mut sum = T::zero();
            for ki in 0..k_h {
                for kj in 0..k_w {
                    let input_i = i + ki as isize - pad_top;
                    let input_j = j + kj as isize - pad_left;

                    if input_i >= 0
                        && input_i < in_h as isize
                        && input_j >= 0
                        && input_j < in_w as isize
                    {
                        let in_idx = input_i as usize * in_w + input_j as usize;
                        sum += input[in_idx] * kernel[ki * k_w + kj];
                    }
                }
            }
            output[out_i * out_w + out_j] = sum;
        }
    }

    Ok(output)
}
