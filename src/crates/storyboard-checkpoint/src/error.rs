//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Checkpoint not found
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid checkpoint
    #[error("Invalid checkpoint: {0}")]
    Invalid(String),

    /// Store configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for CheckpointError {
    fn from(err: sqlx::Error) -> Self {
        CheckpointError::Database(err.to_string())
    }
}
