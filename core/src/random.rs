//! Random grids for benchmarking and verification runs.

use crate::grid::Grid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fills a grid with values uniform in `[0, 1)` drawn from `rng`.
pub fn random_grid<R: Rng>(shape: [usize; 2], rng: &mut R) -> Grid<f32> {
    Grid::from_fn(shape, |_, _| rng.random::<f32>())
}

/// Fills a grid with values uniform in `[0, 1)`.
///
/// With a seed the grid is reproducible across runs; without one it is drawn from the
/// thread-local generator.
pub fn generate(shape: [usize; 2], seed: Option<u64>) -> Grid<f32> {
    match seed {
        Some(seed) => random_grid(shape, &mut StdRng::seed_from_u64(seed)),
        None => random_grid(shape, &mut rand::rng()),
    }
}
