//! # haloconv-kernels
//!
//! The arithmetic half of `haloconv`: everything that can be decided by a single worker
//! without talking to anyone else.
//!
//! - [`geometry`]: the "same"-padding model that maps an output cell to the input window it reads.
//! - [`partition`]: which contiguous block of output rows a worker owns.
//! - [`halo`]: which input rows a worker must stage to compute its block.
//! - [`schedule`]: how a worker splits its block across threads.
//! - [`cpu_conv2d`]: the rayon-parallel correlation kernel and its serial reference.
//!
//! All of these are pure functions of their arguments. Every worker in a group can compute
//! every other worker's assignment without communicating, which is what lets the
//! distribution protocol in `haloconv` stay in lockstep.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod cpu_conv2d;
pub mod geometry;
pub mod halo;
pub mod partition;
pub mod schedule;

pub use cpu_conv2d::{cpu_conv2d_rows, cpu_conv2d_serial};
pub use geometry::ConvGeometry;
pub use halo::{halo_rows, InputSlice};
pub use partition::{row_range, row_ranges};
pub use schedule::{block_rows, Schedule};

/// Which spatial axis a stride or dimension refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Cols,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Rows => f.write_str("rows"),
            Axis::Cols => f.write_str("cols"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// A stride component of zero leaves the output grid undefined.
    #[error("Invalid stride: {axis} stride must be at least 1, got {value}")]
    InvalidStride { axis: Axis, value: usize },
    #[error("Invalid kernel: dimensions must be at least 1x1, got {rows}x{cols}")]
    InvalidKernel { rows: usize, cols: usize },
    #[error("Empty input: feature map must be at least 1x1, got {rows}x{cols}")]
    EmptyInput { rows: usize, cols: usize },
    /// The staged slice does not cover the rows the tile needs.
    #[error("Halo rows {have:?} do not cover required input rows {need:?}")]
    HaloTooSmall {
        have: std::ops::Range<usize>,
        need: std::ops::Range<usize>,
    },
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Trait bound for elements that can be processed by kernels.
///
/// `Send + Sync` is what lets rayon share the read-only input and kernel between threads.
pub trait KernelElem:
    Num + NumAssign + Copy + Clone + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num
        + NumAssign
        + Copy
        + Clone
        + Debug
        + Send
        + Sync
        + FromPrimitive
        + ToPrimitive
        + PartialOrd
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_error_display() {
        let err = KernelError::InvalidStride {
            axis: Axis::Cols,
            value: 0,
        };
        assert_eq!(
            format!("{}", err),
            "Invalid stride: cols stride must be at least 1, got 0"
        );

        let err = KernelError::InvalidKernel { rows: 0, cols: 3 };
        assert_eq!(
            format!("{}", err),
            "Invalid kernel: dimensions must be at least 1x1, got 0x3"
        );

        let err = KernelError::HaloTooSmall { have: 2..5, need: 1..5 };
        assert_eq!(
            format!("{}", err),
            "Halo rows 2..5 do not cover required input rows 1..5"
        );
    }
}
