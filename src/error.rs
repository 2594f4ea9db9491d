//! Error types for prompt-batch-core

use thiserror::Error;

/// Batch-level error type
///
/// Individual run failures never surface here; they are recorded in the
/// batch's result set. These errors cover misuse of the orchestrator
/// lifecycle and invalid construction.
#[derive(Error, Debug)]
pub enum BatchError {
    /// A batch is already running on this orchestrator instance
    #[error("a batch is already running on this orchestrator")]
    AlreadyRunning,

    /// Reset was requested while a batch is still in progress
    #[error("cannot reset while a batch is in progress")]
    BatchInProgress,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A required collaborator was not provided to the builder
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

impl BatchError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        BatchError::Config(msg.into())
    }

    /// Create a missing-collaborator error
    pub fn missing(name: &'static str) -> Self {
        BatchError::MissingCollaborator(name)
    }
}

/// Result type alias
pub type BatchResult<T> = std::result::Result<T, BatchError>;
