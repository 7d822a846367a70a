use crate::error::Result;

/// Abstraction for the communication layer between workers.
///
/// Every method is a *collective*: all workers of the group must call the same sequence of
/// collectives with compatible arguments, or the group deadlocks or reports
/// [`ConvError::Protocol`](crate::ConvError::Protocol). Between any pair of workers, messages are
/// delivered in the order they were sent.
///
/// The trait keeps the protocol independent from the transport:
/// - **CPU/Mesh**: worker threads joined by channels ([`CpuBackend`](super::cpu_backend::CpuBackend)).
/// - **Process groups**: a message-passing runtime can implement the same five collectives.
pub trait CollectiveBackend: Send + Sync {
    /// Returns the id of this worker, in `0..world_size()`.
    fn rank(&self) -> usize;

    /// Returns the number of workers in the group.
    fn world_size(&self) -> usize;

    /// Blocks until every worker has entered the barrier.
    fn barrier(&self) -> Result<()>;

    /// Copies `buf` from `root` into `buf` on every other worker.
    ///
    /// `buf` must have the same length everywhere.
    fn broadcast(&self, buf: &mut [f32], root: usize) -> Result<()>;

    /// Same as [`broadcast`](Self::broadcast), for sizes and other index metadata.
    fn broadcast_indices(&self, values: &mut [usize], root: usize) -> Result<()>;

    /// Variable-count all-gather, in place.
    ///
    /// `buf` is the concatenation of every worker's segment in rank order, where worker `p`
    /// owns `counts[p]` elements. On entry only this worker's segment needs to be filled; on
    /// return every segment holds its owner's data. Zero counts are allowed.
    fn all_gather_in_place(&self, buf: &mut [f32], counts: &[usize]) -> Result<()>;

    /// Returns true on every worker iff every worker passed `ok == true`.
    ///
    /// Used to turn a local failure into a group-wide decision before entering a collective
    /// that would otherwise wait on the failed worker.
    fn all_agree(&self, ok: bool) -> Result<bool>;
}
