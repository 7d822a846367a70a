use crate::distributed::CollectiveBackend;
use crate::error::{ConvError, Result};
use crate::grid::{try_zeroed, Grid};
use tracing::debug;

/// Copies a grid held by `root` to every worker of the group.
///
/// `root` passes `Some(grid)`; every other worker passes `None` (any value it passes is
/// ignored). The shape goes out first, then the whole contiguous buffer in one broadcast.
///
/// # Errors
///
/// - `ConvError::InvalidInput` on every worker if the root has no grid or an empty one.
/// - `ConvError::Allocation` on a worker that cannot allocate the copy, and
///   `ConvError::GroupAborted` on all the others.
pub fn replicate<B: CollectiveBackend + ?Sized>(
    backend: &B,
    root: usize,
    grid: Option<Grid<f32>>,
) -> Result<Grid<f32>> {
    let is_root = backend.rank() == root;
    let mut shape = match (&grid, is_root) {
        (Some(g), true) => g.shape(),
        _ => [0, 0],
    };
    backend.broadcast_indices(&mut shape, root)?;
    if shape[0] == 0 || shape[1] == 0 {
        return Err(haloconv_kernels::KernelError::EmptyInput {
            rows: shape[0],
            cols: shape[1],
        }
        .into());
    }

    let local = match grid {
        Some(g) if is_root => Ok(g),
        _ => shape[0]
            .checked_mul(shape[1])
            .ok_or(ConvError::Allocation { bytes: usize::MAX })
            .and_then(try_zeroed::<f32>)
            .and_then(|data| Grid::new(data, shape)),
    };
    let agreed = backend.all_agree(local.is_ok())?;
    let mut local = match local {
        Err(e) => return Err(e),
        Ok(_) if !agreed => return Err(ConvError::GroupAborted),
        Ok(g) => g,
    };

    backend.broadcast(local.data_mut(), root)?;
    debug!(rank = backend.rank(), root, ?shape, "replicated grid");
    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::spawn_group;

    #[test]
    fn test_replicate_from_root() {
        let source = Grid::from_fn([4, 3], |i, j| (i * 3 + j) as f32);
        for root in 0..3 {
            let results = spawn_group(3, |backend| {
                let grid = (backend.rank() == root).then(|| source.clone());
                replicate(&backend, root, grid)
            })
            .unwrap();
            for grid in results {
                assert_eq!(grid.unwrap(), source);
            }
        }
    }

    #[test]
    fn test_missing_root_grid_fails_everywhere() {
        let results = spawn_group(3, |backend| replicate(&backend, 0, None)).unwrap();
        for r in results {
            assert!(matches!(r, Err(ConvError::InvalidInput(_))));
        }
    }

    /// Root that announces a shape no worker can hold.
    struct HugeShape;

    impl CollectiveBackend for HugeShape {
        fn rank(&self) -> usize {
            1
        }

        fn world_size(&self) -> usize {
            2
        }

        fn barrier(&self) -> Result<()> {
            Ok(())
        }

        fn broadcast(&self, _buf: &mut [f32], _root: usize) -> Result<()> {
            panic!("no data may be broadcast after a failed allocation")
        }

        fn broadcast_indices(&self, values: &mut [usize], _root: usize) -> Result<()> {
            values.copy_from_slice(&[usize::MAX, 3]);
            Ok(())
        }

        fn all_gather_in_place(&self, _buf: &mut [f32], _counts: &[usize]) -> Result<()> {
            unreachable!()
        }

        fn all_agree(&self, ok: bool) -> Result<bool> {
            Ok(ok)
        }
    }

    #[test]
    fn test_overflowing_shape_is_allocation_error() {
        let err = replicate(&HugeShape, 0, None).unwrap_err();
        assert!(matches!(err, ConvError::Allocation { bytes: usize::MAX }));
    }

    #[test]
    fn test_non_root_grid_ignored() {
        let source = Grid::from_fn([2, 2], |i, j| (i + j) as f32);
        let results = spawn_group(2, |backend| {
            let grid = if backend.rank() == 0 {
                source.clone()
            } else {
                Grid::zeros([5, 5])
            };
            replicate(&backend, 0, Some(grid))
        })
        .unwrap();
        for grid in results {
            assert_eq!(grid.unwrap(), source);
        }
    }
}
