//! # haloconv
//!
//! `haloconv` computes a strided, "same"-padded 2-D correlation of a feature map with a small
//! kernel, spread over a group of workers that each use several threads.
//!
//! Each worker owns a contiguous block of output rows. It stages only the input rows that block
//! reads (its *halo*), computes the block with rayon, and then the group reassembles the full
//! output so every worker holds an identical copy. The result does not depend on how many
//! workers or threads took part.
//!
//! ## Modules
//!
//! - [`conv`]: the distribution protocol ([`convolve`], [`convolve_with_stats`], [`replicate`]).
//! - [`distributed`]: the collective backend the protocol runs on, and a thread-based
//!   implementation of it.
//! - [`grid`]: the contiguous 2-D buffer used for inputs, kernels and outputs.
//! - [`stats`]: per-worker timing and traffic counters.
//! - [`io`], [`random`], [`reference`], [`verify`], [`analysis`]: the tooling around a run
//!   (array files, random inputs, single-worker baselines, result comparison, thread sweeps).
//!
//! The per-worker arithmetic (geometry, partitioning, halos, the compute kernel) lives in the
//! `haloconv-kernels` crate and is re-exported where it is part of this API.
//!
//! ## Example
//!
//! ```rust
//! use haloconv::{convolve, reference, spawn_group, ConvConfig, Grid, Stride};
//!
//! let input = haloconv::random::generate([32, 24], Some(7));
//! let kernel = Grid::<f32>::from_fn([3, 3], |_, _| 1.0 / 9.0);
//! let stride = Stride::new(2, 2);
//! let expected = reference::serial(&input, &kernel, stride).unwrap();
//!
//! let config = ConvConfig::default().with_threads(2);
//! let outputs = spawn_group(4, |backend| convolve(&backend, &input, &kernel, stride, &config))
//!     .unwrap();
//! for output in outputs {
//!     assert_eq!(output.unwrap(), expected);
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod conv;
pub mod distributed;
pub mod error;
pub mod grid;
pub mod io;
pub mod random;
pub mod reference;
pub mod stats;
pub mod verify;

pub use config::{ConvConfig, Reassembly, Stride};
pub use conv::{convolve, convolve_with_stats, replicate};
pub use distributed::{spawn_group, CollectiveBackend, CpuBackend};
pub use error::{ConvError, Result};
pub use grid::Grid;
pub use haloconv_kernels::{KernelError, Schedule};
pub use stats::PerfStats;
