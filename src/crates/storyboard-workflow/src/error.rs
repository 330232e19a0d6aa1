//! Error types for workflow operations

use storyboard_checkpoint::{CheckpointError, WorkflowState};
use thiserror::Error;

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur while driving the workflow
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No project for the given id or scope
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// No scene with the given id in the project
    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    /// Workflow precondition not met
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Direct state change that the workflow rules do not allow
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: WorkflowState,
        to: WorkflowState,
        reason: String,
    },

    /// A scene stage was attempted before the stage it depends on
    #[error("Stage gate violated: {0}")]
    StageGate(String),

    /// Input outside configured limits
    #[error("Validation failed: {0}")]
    Validation(String),

    /// External generation failed or timed out
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Persistence failure
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl WorkflowError {
    /// Errors reported back to callers as a failed result rather than
    /// propagated as faults
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WorkflowError::Checkpoint(_))
    }
}
