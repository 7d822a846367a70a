use super::cpu_backend::CpuBackend;
use crate::error::{ConvError, Result};
use std::thread;

/// Runs `f` once per worker, each on its own thread with its own [`CpuBackend`].
///
/// Returns the workers' results in rank order. The backend is moved into `f`, so a worker that
/// returns early releases its channels and its peers see [`ConvError::Disconnected`] rather than
/// waiting on it. Threads are scoped, so `f` may borrow from the caller.
///
/// # Errors
///
/// Returns [`ConvError::WorkerPanicked`] for the lowest rank whose thread panicked.
///
/// ```rust
/// use haloconv::distributed::{spawn_group, CollectiveBackend};
///
/// let ranks = spawn_group(3, |backend| backend.rank()).unwrap();
/// assert_eq!(ranks, vec![0, 1, 2]);
/// ```
pub fn spawn_group<F, R>(world_size: usize, f: F) -> Result<Vec<R>>
where
    F: Fn(CpuBackend) -> R + Sync,
    R: Send,
{
    let backends = CpuBackend::mesh(world_size);
    thread::scope(|scope| {
        let handles: Vec<_> = backends
            .into_iter()
            .map(|backend| {
                let f = &f;
                scope.spawn(move || f(backend))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        let mut panicked = None;
        for (rank, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(r) => results.push(r),
                Err(_) => {
                    panicked.get_or_insert(rank);
                }
            }
        }
        match panicked {
            Some(rank) => Err(ConvError::WorkerPanicked { rank }),
            None => Ok(results),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::CollectiveBackend;

    #[test]
    fn test_results_in_rank_order() {
        let out = spawn_group(4, |backend| backend.rank() * 10).unwrap();
        assert_eq!(out, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_borrows_from_caller() {
        let shared = vec![1.0f32, 2.0, 3.0];
        let sums = spawn_group(2, |_| shared.iter().sum::<f32>()).unwrap();
        assert_eq!(sums, vec![6.0, 6.0]);
    }

    #[test]
    fn test_panicking_worker_reported() {
        let result = spawn_group(3, |backend| {
            if backend.rank() == 1 {
                panic!("worker failure");
            }
            // Peers notice the dead worker instead of hanging.
            backend.barrier()
        });
        assert!(matches!(result, Err(ConvError::WorkerPanicked { rank: 1 })));
    }

    #[test]
    fn test_empty_group() {
        let out = spawn_group(0, |backend| backend.rank()).unwrap();
        assert!(out.is_empty());
    }
}
