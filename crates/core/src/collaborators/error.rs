//! Error types for collaborator operations.

use thiserror::Error;

/// Errors surfaced by an external collaborator call.
///
/// From the runner's point of view every variant means the same thing: the
/// operation did not succeed and the run has to stop.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The operation ran but reported failure.
    #[error("{operation} failed: {reason}")]
    Failed { operation: String, reason: String },

    /// Something required before the call could be made is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation did not finish within its time budget.
    #[error("{operation} timed out after {timeout_secs} seconds")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    /// Arguments rejected before touching any external system.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Relational store error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl CollaboratorError {
    /// Creates a failed-operation error.
    pub fn failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}
