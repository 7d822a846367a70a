use crate::config::Reassembly;
use crate::distributed::CollectiveBackend;
use crate::error::Result;
use haloconv_kernels::row_ranges;

/// Fills every worker's rows of `output` from their owners, in place.
///
/// On entry `output` holds this worker's tile at its rows; on return it holds the full grid on
/// every worker. Returns the number of collectives issued.
pub(crate) fn reassemble<B: CollectiveBackend + ?Sized>(
    backend: &B,
    policy: Reassembly,
    output: &mut [f32],
    out_h: usize,
    out_w: usize,
) -> Result<usize> {
    let world_size = backend.world_size();
    match policy {
        Reassembly::AllGather => {
            let counts: Vec<usize> = row_ranges(out_h, world_size)
                .map(|rows| rows.len() * out_w)
                .collect();
            backend.all_gather_in_place(output, &counts)?;
            Ok(1)
        }
        Reassembly::BroadcastRows => {
            // Rows go out in index order; each worker derives the owner of every row from the
            // partition, so all workers issue the same sequence of broadcasts.
            let mut issued = 0;
            for (owner, rows) in row_ranges(out_h, world_size).enumerate() {
                for i in rows {
                    backend.broadcast(&mut output[i * out_w..(i + 1) * out_w], owner)?;
                    issued += 1;
                }
            }
            Ok(issued)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::spawn_group;
    use haloconv_kernels::row_range;

    fn run(policy: Reassembly, workers: usize, out_h: usize, out_w: usize) -> Vec<(Vec<f32>, usize)> {
        spawn_group(workers, |backend| {
            let mut output = vec![-1.0f32; out_h * out_w];
            let rows = row_range(out_h, workers, backend.rank());
            for i in rows {
                for j in 0..out_w {
                    output[i * out_w + j] = (i * out_w + j) as f32;
                }
            }
            let issued = reassemble(&backend, policy, &mut output, out_h, out_w)?;
            Ok::<_, crate::ConvError>((output, issued))
        })
        .unwrap()
        .into_iter()
        .map(|r| r.unwrap())
        .collect()
    }

    #[test]
    fn test_policies_agree() {
        let expected: Vec<f32> = (0..7 * 4).map(|v| v as f32).collect();
        for workers in [2, 3, 5, 9] {
            for (out, issued) in run(Reassembly::AllGather, workers, 7, 4) {
                assert_eq!(out, expected);
                assert_eq!(issued, 1);
            }
            for (out, issued) in run(Reassembly::BroadcastRows, workers, 7, 4) {
                assert_eq!(out, expected);
                assert_eq!(issued, 7);
            }
        }
    }
}
