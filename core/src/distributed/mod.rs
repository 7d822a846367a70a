//! # Workers and Collectives
//!
//! A convolution in `haloconv` runs on a *group* of workers. Each worker owns a slice of the
//! output, computes it locally, and then takes part in a few collective operations so every
//! worker ends up with the full result.
//!
//! ## The protocol vocabulary
//!
//! *   **Barrier**: nobody proceeds until everybody has arrived. Brackets each call so timings
//!     taken on different workers measure the same interval.
//! *   **Broadcast**: one worker (the *root*) sends a buffer, everybody else receives it.
//! *   **All-Gather**: every worker contributes a segment, everybody receives the concatenation.
//!     Segments may differ in size (and may be empty).
//! *   **Agree**: a one-bit vote. If any worker votes "no", every worker learns it in the same
//!     step, so the whole group can abort together.
//!
//! ## Module contents
//!
//! *   [`CollectiveBackend`]: the transport interface the convolution is written against.
//! *   [`CpuBackend`]: workers as threads, joined by a mesh of channels.
//! *   [`spawn_group`]: launch a group of thread workers and collect their results.

pub mod backend;
pub mod cpu_backend;
pub mod group;

pub use backend::CollectiveBackend;
pub use cpu_backend::{CpuBackend, Packet};
pub use group::spawn_group;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_from_each_root() {
        for root in 0..3 {
            let results = spawn_group(3, |backend| {
                let mut buf = if backend.rank() == root {
                    vec![root as f32; 4]
                } else {
                    vec![-1.0; 4]
                };
                backend.broadcast(&mut buf, root).map(|_| buf)
            })
            .unwrap();
            for buf in results {
                assert_eq!(buf.unwrap(), vec![root as f32; 4]);
            }
        }
    }

    #[test]
    fn test_all_gather_variable_counts() {
        // Worker 2 contributes nothing.
        let counts = [3, 1, 0, 2];
        let results = spawn_group(4, |backend| {
            let rank = backend.rank();
            let offset: usize = counts[..rank].iter().sum();
            let mut buf = vec![0.0f32; 6];
            for x in &mut buf[offset..offset + counts[rank]] {
                *x = (rank + 1) as f32;
            }
            backend.all_gather_in_place(&mut buf, &counts).map(|_| buf)
        })
        .unwrap();

        for buf in results {
            assert_eq!(buf.unwrap(), vec![1.0, 1.0, 1.0, 2.0, 4.0, 4.0]);
        }
    }

    #[test]
    fn test_all_gather_rejects_bad_counts() {
        let results = spawn_group(2, |backend| {
            let mut buf = vec![0.0f32; 3];
            backend.all_gather_in_place(&mut buf, &[1, 1])
        })
        .unwrap();
        for r in results {
            assert!(matches!(r, Err(crate::ConvError::ShapeMismatch { .. })));
        }
    }

    #[test]
    fn test_agree_single_dissent() {
        for dissenter in 0..4 {
            let votes = spawn_group(4, |backend| backend.all_agree(backend.rank() != dissenter))
                .unwrap();
            assert!(votes.into_iter().all(|v| matches!(v, Ok(false))));
        }
        let votes = spawn_group(4, |backend| backend.all_agree(true)).unwrap();
        assert!(votes.into_iter().all(|v| matches!(v, Ok(true))));
    }

    #[test]
    fn test_collectives_stay_in_order() {
        // Several back-to-back broadcasts from different roots must not be confused.
        let results = spawn_group(3, |backend| {
            let mut seen = Vec::new();
            for step in 0..9 {
                let root = step % 3;
                let mut buf = [if backend.rank() == root { step as f32 } else { 0.0 }];
                backend.broadcast(&mut buf, root)?;
                seen.push(buf[0]);
            }
            backend.barrier()?;
            Ok::<_, crate::ConvError>(seen)
        })
        .unwrap();

        let expected: Vec<f32> = (0..9).map(|s| s as f32).collect();
        for seen in results {
            assert_eq!(seen.unwrap(), expected);
        }
    }

    #[test]
    fn test_broadcast_indices() {
        let results = spawn_group(2, |backend| {
            let mut dims = if backend.rank() == 0 { [7, 9] } else { [0, 0] };
            backend.broadcast_indices(&mut dims, 0).map(|_| dims)
        })
        .unwrap();
        for dims in results {
            assert_eq!(dims.unwrap(), [7, 9]);
        }
    }
}
