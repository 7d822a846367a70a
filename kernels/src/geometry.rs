//! Grid and padding model.
//!
//! # "Same" padding with stride
//!
//! Output cell `(out_i, out_j)` samples input position `(out_i * s_h, out_j * s_w)` and
//! centres the kernel there. The kernel's top-left tap lands `pad_top` rows above and
//! `pad_left` columns to the left:
//!
//! ```text
//! pad_top  = (k_h - 1) / 2
//! pad_left = (k_w - 1) / 2
//! ```
//!
//! For odd kernels the padding is symmetric. For even kernels integer division rounds down,
//! so one more padded row (column) trails than leads.
//!
//! Taps that fall outside `[0, in_h) x [0, in_w)` read an implicit zero. The output grid is
//! `ceil(in_h / s_h) x ceil(in_w / s_w)`, which at stride 1 matches the input extent.

use crate::{Axis, KernelError, Result};
use std::ops::Range;

/// Validated dimensions of one correlation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    in_h: usize,
    in_w: usize,
    k_h: usize,
    k_w: usize,
    stride_h: usize,
    stride_w: usize,
}

impl ConvGeometry {
    /// Creates a geometry, rejecting inputs that would make the output grid undefined.
    ///
    /// # Arguments
    ///
    /// * `input` - Feature map dimensions `[in_h, in_w]`.
    /// * `kernel` - Kernel dimensions `[k_h, k_w]`.
    /// * `stride` - Sampling stride `[stride_h, stride_w]`.
    ///
    /// # Errors
    ///
    /// - `KernelError::InvalidStride` if either stride component is zero.
    /// - `KernelError::InvalidKernel` if either kernel dimension is zero.
    /// - `KernelError::EmptyInput` if either input dimension is zero.
    pub fn new(input: [usize; 2], kernel: [usize; 2], stride: [usize; 2]) -> Result<Self> {
        if stride[0] == 0 {
            return Err(KernelError::InvalidStride {
                axis: Axis::Rows,
                value: stride[0],
            });
        }
        if stride[1] == 0 {
            return Err(KernelError::InvalidStride {
                axis: Axis::Cols,
                value: stride[1],
            });
        }
        if kernel[0] == 0 || kernel[1] == 0 {
            return Err(KernelError::InvalidKernel {
                rows: kernel[0],
                cols: kernel[1],
            });
        }
        if input[0] == 0 || input[1] == 0 {
            return Err(KernelError::EmptyInput {
                rows: input[0],
                cols: input[1],
            });
        }

        Ok(Self {
            in_h: input[0],
            in_w: input[1],
            k_h: kernel[0],
            k_w: kernel[1],
            stride_h: stride[0],
            stride_w: stride[1],
        })
    }

    pub const fn in_h(&self) -> usize {
        self.in_h
    }

    pub const fn in_w(&self) -> usize {
        self.in_w
    }

    pub const fn k_h(&self) -> usize {
        self.k_h
    }

    pub const fn k_w(&self) -> usize {
        self.k_w
    }

    pub const fn stride_h(&self) -> usize {
        self.stride_h
    }

    pub const fn stride_w(&self) -> usize {
        self.stride_w
    }

    /// `ceil(in_h / stride_h)`.
    pub const fn out_h(&self) -> usize {
        self.in_h.div_ceil(self.stride_h)
    }

    /// `ceil(in_w / stride_w)`.
    pub const fn out_w(&self) -> usize {
        self.in_w.div_ceil(self.stride_w)
    }

    pub const fn pad_top(&self) -> usize {
        (self.k_h - 1) / 2
    }

    pub const fn pad_left(&self) -> usize {
        (self.k_w - 1) / 2
    }

    /// Number of multiply-adds per output cell (before boundary clipping).
    pub const fn taps(&self) -> usize {
        self.k_h * self.k_w
    }

    /// The input rows read by output row `out_i`, clipped to `[0, in_h)`.
    ///
    /// This is the per-row building block of the halo: the union over a worker's rows is
    /// exactly what [`crate::halo::halo_rows`] returns.
    pub fn input_rows_for(&self, out_i: usize) -> Range<usize> {
        let (start, end) = self.window(out_i * self.stride_h, self.pad_top(), self.k_h);
        start..end.min(self.in_h)
    }

    /// The input columns read by output column `out_j`, clipped to `[0, in_w)`.
    pub fn input_cols_for(&self, out_j: usize) -> Range<usize> {
        let (start, end) = self.window(out_j * self.stride_w, self.pad_left(), self.k_w);
        start..end.min(self.in_w)
    }

    /// Unclipped-above window `[centre - pad, centre - pad + extent)`, clamped at zero.
    fn window(&self, centre: usize, pad: usize, extent: usize) -> (usize, usize) {
        let start = centre.saturating_sub(pad);
        let end = centre + extent - pad;
        (start, end)
    }
}
