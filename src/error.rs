//! Error types for the fall sentinel library.

use thiserror::Error;

/// Errors raised by the library layer.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// A landmark set did not have the fixed pose-model cardinality.
    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An alert sink failed to deliver.
    #[error("alert sink '{sink}' failed: {reason}")]
    Sink { sink: String, reason: String },

    /// The alert delivery thread could not be spawned.
    #[error("failed to start alert worker: {0}")]
    Worker(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
