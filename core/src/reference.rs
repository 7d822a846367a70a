//! Single-worker implementations, used to check distributed results and as baselines when
//! measuring speedup.

use crate::config::Stride;
use crate::conv::{build_pool, install};
use crate::error::Result;
use crate::grid::{try_zeroed, Grid};
use haloconv_kernels::{cpu_conv2d_rows, cpu_conv2d_serial, ConvGeometry, InputSlice, Schedule};
use std::num::NonZeroUsize;

/// One thread, no partitioning, no halo: the plain definition of the correlation.
pub fn serial(input: &Grid<f32>, kernel: &Grid<f32>, stride: Stride) -> Result<Grid<f32>> {
    let geometry = ConvGeometry::new(input.shape(), kernel.shape(), stride.as_array())?;
    let data = cpu_conv2d_serial(input.data(), kernel.data(), &geometry)?;
    Grid::new(data, [geometry.out_h(), geometry.out_w()])
}

/// One worker, `threads` compute threads (or the global rayon pool for `None`).
pub fn threaded(
    input: &Grid<f32>,
    kernel: &Grid<f32>,
    stride: Stride,
    threads: Option<NonZeroUsize>,
    schedule: Schedule,
) -> Result<Grid<f32>> {
    let geometry = ConvGeometry::new(input.shape(), kernel.shape(), stride.as_array())?;
    let (out_h, out_w) = (geometry.out_h(), geometry.out_w());
    let mut out = try_zeroed::<f32>(out_h * out_w)?;
    let slice = InputSlice::whole(input.data(), input.cols())?;
    let pool = build_pool(threads)?;
    install(pool.as_ref(), || {
        cpu_conv2d_rows(
            &slice,
            kernel.data(),
            &geometry,
            0..out_h,
            schedule,
            &mut out,
        )
    })?;
    Grid::new(out, [out_h, out_w])
}
