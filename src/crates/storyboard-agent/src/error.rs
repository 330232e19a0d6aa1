//! Error types for agent tools

use storyboard_workflow::WorkflowError;
use thiserror::Error;

/// Result type for tool execution
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that escape tool execution
///
/// Expected failures (bad input, missing project, generation errors) are
/// reported as a failed [`ToolResult`](crate::ToolResult) instead.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No tool registered under the name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Input rejected by the tool's schema
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
