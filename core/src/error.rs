use haloconv_kernels::KernelError;
use thiserror::Error;

/// Error type for `haloconv` operations.
///
/// Invalid-input errors are always raised before the first collective of a call, and every
/// worker receives the same arguments, so they are reported by the whole group at once.
#[derive(Error, Debug)]
pub enum ConvError {
    /// The shape of the data does not match the expected shape.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// Stride, kernel or input dimensions that make the call undefined.
    #[error("Invalid input: {0}")]
    InvalidInput(KernelError),
    /// A buffer this worker must write into could not be allocated.
    #[error("Failed to allocate {bytes} bytes")]
    Allocation { bytes: usize },
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// Another worker failed its local phase; this worker aborted with it.
    #[error("Aborted: another worker in the group failed")]
    GroupAborted,
    /// A peer dropped its end of the channel mid-protocol.
    #[error("Peer {peer} disconnected")]
    Disconnected { peer: usize },
    /// A peer sent something other than what this collective expects.
    #[error("Protocol violation: {0}")]
    Protocol(String),
    #[error("Worker {rank} panicked")]
    WorkerPanicked { rank: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error at {location}: {message}")]
    Parse { location: String, message: String },
}

impl ConvError {
    /// True for errors caused by the call's arguments rather than by the environment.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ConvError::InvalidInput(_) | ConvError::ShapeMismatch { .. }
        )
    }
}

impl From<KernelError> for ConvError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::ShapeMismatch { expected, got } => {
                ConvError::ShapeMismatch { expected, got }
            }
            other => ConvError::InvalidInput(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvError>;
