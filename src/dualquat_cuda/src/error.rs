//! Error types for batch validation and device access.

use thiserror::Error;

/// Errors surfaced by batch construction, dispatch, and device probing.
///
/// None of these are retried internally: shape errors are caller bugs the
/// caller can recover from, device errors are fatal for the process.
#[derive(Error, Debug)]
pub enum DualQuatError {
    /// A batch's trailing dimension does not match the element width
    /// (8 for dual quaternions, 4 for quaternions, 3 for points).
    #[error("expected trailing dimension {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// A buffer whose length is not a whole number of rows at the
    /// claimed element width.
    #[error("buffer of {len} floats is not a whole number of {width}-wide rows")]
    RaggedBuffer { len: usize, width: usize },

    /// Binary operation over batches whose lengths disagree and neither
    /// side is a length-1 broadcast.
    #[error("batch length mismatch: lhs has {lhs} rows, rhs has {rhs}")]
    BatchLenMismatch { lhs: usize, rhs: usize },

    /// The probed device is older than the minimum supported capability.
    #[error(
        "device compute capability {major}.{minor} is below the required {required_major}.{required_minor}"
    )]
    UnsupportedDevice {
        major: i32,
        minor: i32,
        required_major: i32,
        required_minor: i32,
    },

    /// No usable CUDA driver or device was found. Surfaced at probe time
    /// (module import), never deferred to first use.
    #[error("no compatible CUDA device: {0}")]
    EnvironmentUnavailable(String),
}

pub type Result<T> = std::result::Result<T, DualQuatError>;
