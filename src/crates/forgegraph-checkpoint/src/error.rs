//! Error types for checkpoint storage backends.

use thiserror::Error;

/// Errors surfaced by [`Checkpointer`](crate::traits::Checkpointer)
/// implementations and the serialization codecs.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The caller passed an unusable argument (empty thread id, etc.).
    #[error("invalid checkpoint request: {0}")]
    Invalid(String),

    /// Encoding or decoding a checkpoint failed.
    #[error("checkpoint serialization failed: {0}")]
    Serialization(String),

    /// The backing store reported a failure.
    #[error("checkpoint storage failed: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for CheckpointError {
    fn from(err: serde_json::Error) -> Self {
        CheckpointError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(err: bincode::Error) -> Self {
        CheckpointError::Serialization(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CheckpointError>;
