use crate::error::{ConvError, Result};
use crate::grid::Grid;
use haloconv_kernels::InputSlice;
use std::ops::Range;

/// The input rows a worker computes from.
#[derive(Debug)]
pub(crate) enum Staged<'a> {
    /// The worker owns no output rows.
    Idle,
    /// The whole input, borrowed. Only valid when one worker owns every row.
    Aliased(&'a [f32]),
    /// A private copy of the halo rows `first_row..first_row + data.len() / cols`.
    Copied { data: Vec<f32>, first_row: usize },
}

impl<'a> Staged<'a> {
    /// Stages `halo` out of `input`, either by borrowing the input or by copying the rows into
    /// a freshly allocated buffer.
    ///
    /// # Errors
    ///
    /// Returns `ConvError::Allocation` if the copy buffer cannot be allocated; nothing is
    /// partially staged in that case.
    pub(crate) fn stage(
        input: &'a Grid<f32>,
        halo: Option<Range<usize>>,
        alias: bool,
    ) -> Result<Self> {
        let Some(halo) = halo else {
            return Ok(Staged::Idle);
        };
        if alias {
            return Ok(Staged::Aliased(input.data()));
        }

        let cols = input.cols();
        let src = &input.data()[halo.start * cols..halo.end * cols];
        let mut data = Vec::new();
        data.try_reserve_exact(src.len())
            .map_err(|_| ConvError::Allocation {
                bytes: std::mem::size_of_val(src),
            })?;
        data.extend_from_slice(src);
        Ok(Staged::Copied {
            data,
            first_row: halo.start,
        })
    }

    /// Bytes copied out of the input.
    pub(crate) fn copied_bytes(&self) -> usize {
        match self {
            Staged::Copied { data, .. } => std::mem::size_of_val(data.as_slice()),
            _ => 0,
        }
    }

    /// A view for the kernel, or `None` when there is nothing to compute.
    pub(crate) fn slice(&self, cols: usize) -> Result<Option<InputSlice<'_, f32>>> {
        let slice = match self {
            Staged::Idle => return Ok(None),
            Staged::Aliased(data) => InputSlice::whole(data, cols)?,
            Staged::Copied { data, first_row } => InputSlice::new(data, *first_row, cols)?,
        };
        Ok(Some(slice))
    }
}
