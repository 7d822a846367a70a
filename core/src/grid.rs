//! Dense 2-D grids.
//!
//! A [`Grid`] is one contiguous row-major buffer plus its dimensions. Row `i` is the slice
//! `data[i * cols..(i + 1) * cols]`; there is no per-row allocation, so a grid is either fully
//! allocated or not allocated at all.
//!
//! ```rust
//! use haloconv::Grid;
//!
//! let grid = Grid::<f32>::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
//! assert_eq!(grid.shape(), [2, 3]);
//! assert_eq!(grid.row(1), &[4.0, 5.0, 6.0]);
//! assert_eq!(grid[(0, 2)], 3.0);
//! ```

use crate::error::{ConvError, Result};
use haloconv_kernels::KernelElem;
use std::fmt::Debug;
use std::ops::{Index, IndexMut};

#[derive(Clone, PartialEq)]
pub struct Grid<T: KernelElem> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: KernelElem> Grid<T> {
    /// Creates a grid from row-major data.
    ///
    /// # Errors
    ///
    /// Returns `ConvError::ShapeMismatch` if `data.len() != rows * cols`, or if `rows * cols`
    /// overflows.
    pub fn new(data: Vec<T>, shape: [usize; 2]) -> Result<Self> {
        match shape[0].checked_mul(shape[1]) {
            Some(size) if size == data.len() => {}
            Some(size) => {
                return Err(ConvError::ShapeMismatch {
                    expected: vec![size],
                    got: vec![data.len()],
                })
            }
            None => {
                return Err(ConvError::ShapeMismatch {
                    expected: shape.to_vec(),
                    got: vec![data.len()],
                })
            }
        }
        Ok(Self {
            rows: shape[0],
            cols: shape[1],
            data,
        })
    }

    /// # Panics
    ///
    /// Panics if `rows * cols` overflows.
    pub fn zeros(shape: [usize; 2]) -> Self {
        Self {
            rows: shape[0],
            cols: shape[1],
            data: vec![T::zero(); cell_count(shape)],
        }
    }

    /// Creates a grid by evaluating `f(row, col)` for every cell.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows.
    pub fn from_fn(shape: [usize; 2], mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(cell_count(shape));
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                data.push(f(i, j));
            }
        }
        Self {
            rows: shape[0],
            cols: shape[1],
            data,
        }
    }

    /// Returns `[rows, cols]`.
    pub const fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= rows`.
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterates over rows, top to bottom.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // `chunks_exact(0)` panics, and a zero-column grid has no visible rows anyway.
        self.data.chunks_exact(self.cols.max(1))
    }

    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        if i < self.rows && j < self.cols {
            Some(self.data[i * self.cols + j])
        } else {
            None
        }
    }
}

impl<T: KernelElem> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of bounds for grid {}x{}",
            i,
            j,
            self.rows,
            self.cols
        );
        &self.data[i * self.cols + j]
    }
}

impl<T: KernelElem> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of bounds for grid {}x{}",
            i,
            j,
            self.rows,
            self.cols
        );
        &mut self.data[i * self.cols + j]
    }
}

impl<T: KernelElem> Debug for Grid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("shape", &self.shape())
            .field("data_len", &self.data.len())
            .finish()
    }
}

fn cell_count(shape: [usize; 2]) -> usize {
    match shape[0].checked_mul(shape[1]) {
        Some(n) => n,
        None => panic!("grid shape {}x{} overflows usize", shape[0], shape[1]),
    }
}

/// Allocates `len` zeros, reporting failure instead of aborting.
pub(crate) fn try_zeroed<T: KernelElem>(len: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| ConvError::Allocation {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    data.resize(len, T::zero());
    Ok(data)
}
