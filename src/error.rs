//! Error types for litepipe.
//!
//! Queue backpressure, closed-queue pushes and closed-and-empty pops are not
//! errors; they are reported through `bool` and `Option` results on
//! [`BoundedDeque`](crate::queue::BoundedDeque). The variants here cover
//! setup mistakes and failures of the external collaborators.

use thiserror::Error;

/// Result type alias using litepipe's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for litepipe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A queue was created with a capacity of zero.
    #[error("queue capacity must be at least 1")]
    InvalidCapacity,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The packet source failed to read.
    #[error("source error: {0}")]
    Source(String),

    /// A decoder failed on a packet.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame sink failed to present a frame.
    #[error("present error: {0}")]
    Present(String),

    /// A stage thread panicked.
    #[error("stage '{0}' panicked")]
    StagePanicked(String),

    /// A queue invariant did not hold after a stress run.
    #[error("queue invariant violated: {0}")]
    InvariantViolated(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
