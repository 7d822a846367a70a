use super::backend::CollectiveBackend;
use crate::error::{ConvError, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

/// A message between two workers of a [`CpuBackend`] group.
#[derive(Debug, Clone)]
pub enum Packet {
    /// Barrier arrival.
    Token,
    /// Ballot for [`CollectiveBackend::all_agree`].
    Vote(bool),
    Values(Arc<[f32]>),
    Indices(Arc<[usize]>),
}

impl Packet {
    fn kind(&self) -> &'static str {
        match self {
            Packet::Token => "token",
            Packet::Vote(_) => "vote",
            Packet::Values(_) => "values",
            Packet::Indices(_) => "indices",
        }
    }
}

/// A CPU-based collective backend where each worker is a thread.
///
/// Workers are joined by a full mesh of `crossbeam` channels: worker `r` owns the sending end
/// of one channel to every peer and the receiving end of one channel from every peer. Since
/// each ordered pair has its own channel, messages from one peer never overtake each other,
/// and a slow peer cannot reorder another peer's traffic.
///
/// Channels are unbounded, so every collective sends everything first and then receives.
/// When a worker drops its backend, peers waiting on it get [`ConvError::Disconnected`]
/// instead of blocking forever.
pub struct CpuBackend {
    rank: usize,
    world_size: usize,
    tx: Vec<Sender<Packet>>,   // tx[p]: to peer p
    rx: Vec<Receiver<Packet>>, // rx[p]: from peer p
}

impl CpuBackend {
    /// Creates a backend from explicit channel ends.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= world_size` or if either channel list does not have `world_size`
    /// entries.
    pub fn new(
        rank: usize,
        world_size: usize,
        tx: Vec<Sender<Packet>>,
        rx: Vec<Receiver<Packet>>,
    ) -> Self {
        assert!(rank < world_size, "rank {} outside group of {}", rank, world_size);
        assert_eq!(tx.len(), world_size, "need one sender per worker");
        assert_eq!(rx.len(), world_size, "need one receiver per worker");
        Self {
            rank,
            world_size,
            tx,
            rx,
        }
    }

    /// Creates a fully connected group of `world_size` backends, in rank order.
    pub fn mesh(world_size: usize) -> Vec<CpuBackend> {
        let mut senders: Vec<Vec<Sender<Packet>>> = (0..world_size)
            .map(|_| Vec::with_capacity(world_size))
            .collect();
        let mut receivers: Vec<Vec<Receiver<Packet>>> = (0..world_size)
            .map(|_| Vec::with_capacity(world_size))
            .collect();

        // senders[src][dst] pairs with receivers[dst][src].
        for src_senders in senders.iter_mut() {
            for dst_receivers in receivers.iter_mut() {
                let (tx, rx) = unbounded();
                src_senders.push(tx);
                dst_receivers.push(rx);
            }
        }

        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (tx, rx))| CpuBackend::new(rank, world_size, tx, rx))
            .collect()
    }

    fn peers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.world_size).filter(move |&p| p != self.rank)
    }

    fn send(&self, peer: usize, packet: Packet) -> Result<()> {
        self.tx[peer]
            .send(packet)
            .map_err(|_| ConvError::Disconnected { peer })
    }

    fn recv(&self, peer: usize) -> Result<Packet> {
        self.rx[peer]
            .recv()
            .map_err(|_| ConvError::Disconnected { peer })
    }

    fn check_root(&self, root: usize) -> Result<()> {
        if root >= self.world_size {
            return Err(ConvError::Protocol(format!(
                "broadcast root {} outside group of {}",
                root, self.world_size
            )));
        }
        Ok(())
    }

    fn recv_values(&self, peer: usize, len: usize) -> Result<Arc<[f32]>> {
        match self.recv(peer)? {
            Packet::Values(v) if v.len() == len => Ok(v),
            Packet::Values(v) => Err(ConvError::Protocol(format!(
                "expected {} values from worker {}, got {}",
                len,
                peer,
                v.len()
            ))),
            other => Err(unexpected(peer, "values", &other)),
        }
    }
}

fn unexpected(peer: usize, wanted: &str, got: &Packet) -> ConvError {
    ConvError::Protocol(format!(
        "expected {} from worker {}, got {}",
        wanted,
        peer,
        got.kind()
    ))
}

impl CollectiveBackend for CpuBackend {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn barrier(&self) -> Result<()> {
        for peer in self.peers() {
            self.send(peer, Packet::Token)?;
        }
        for peer in self.peers() {
            match self.recv(peer)? {
                Packet::Token => {}
                other => return Err(unexpected(peer, "token", &other)),
            }
        }
        Ok(())
    }

    fn broadcast(&self, buf: &mut [f32], root: usize) -> Result<()> {
        self.check_root(root)?;
        if self.rank == root {
            let shared: Arc<[f32]> = Arc::from(&*buf);
            for peer in self.peers() {
                self.send(peer, Packet::Values(Arc::clone(&shared)))?;
            }
        } else {
            let values = self.recv_values(root, buf.len())?;
            buf.copy_from_slice(&values);
        }
        Ok(())
    }

    fn broadcast_indices(&self, values: &mut [usize], root: usize) -> Result<()> {
        self.check_root(root)?;
        if self.rank == root {
            let shared: Arc<[usize]> = Arc::from(&*values);
            for peer in self.peers() {
                self.send(peer, Packet::Indices(Arc::clone(&shared)))?;
            }
        } else {
            match self.recv(root)? {
                Packet::Indices(v) if v.len() == values.len() => values.copy_from_slice(&v),
                Packet::Indices(v) => {
                    return Err(ConvError::Protocol(format!(
                        "expected {} indices from worker {}, got {}",
                        values.len(),
                        root,
                        v.len()
                    )))
                }
                other => return Err(unexpected(root, "indices", &other)),
            }
        }
        Ok(())
    }

    fn all_gather_in_place(&self, buf: &mut [f32], counts: &[usize]) -> Result<()> {
        if counts.len() != self.world_size {
            return Err(ConvError::Protocol(format!(
                "all-gather needs {} counts, got {}",
                self.world_size,
                counts.len()
            )));
        }
        let total: usize = counts.iter().sum();
        if total != buf.len() {
            return Err(ConvError::ShapeMismatch {
                expected: vec![total],
                got: vec![buf.len()],
            });
        }

        let offsets: Vec<usize> = counts
            .iter()
            .scan(0, |acc, &c| {
                let start = *acc;
                *acc += c;
                Some(start)
            })
            .collect();

        let own = offsets[self.rank]..offsets[self.rank] + counts[self.rank];
        let shared: Arc<[f32]> = Arc::from(&buf[own]);
        for peer in self.peers() {
            self.send(peer, Packet::Values(Arc::clone(&shared)))?;
        }
        for peer in self.peers() {
            let values = self.recv_values(peer, counts[peer])?;
            buf[offsets[peer]..offsets[peer] + counts[peer]].copy_from_slice(&values);
        }
        Ok(())
    }

    fn all_agree(&self, ok: bool) -> Result<bool> {
        for peer in self.peers() {
            self.send(peer, Packet::Vote(ok))?;
        }
        // Every ballot is drained, even after a "no", so the channels stay in step.
        let mut all = ok;
        for peer in self.peers() {
            match self.recv(peer)? {
                Packet::Vote(v) => all &= v,
                other => return Err(unexpected(peer, "vote", &other)),
            }
        }
        Ok(all)
    }
}
