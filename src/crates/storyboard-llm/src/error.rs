//! Error types for the LLM provider.

use std::time::Duration;
use storyboard_workflow::GenerationError;
use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to an LLM endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the API.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Provider temporarily unavailable (5xx).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing or invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => LlmError::Authentication(body),
            429 => LlmError::RateLimited(body),
            500..=599 => LlmError::ServiceUnavailable(format!("{}: {}", status, body)),
            _ => LlmError::Api {
                status,
                message: body,
            },
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_connect() || e.is_timeout(),
            LlmError::RateLimited(_) | LlmError::ServiceUnavailable(_) | LlmError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, LlmError::Authentication(_))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidResponse(err.to_string())
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(duration) => GenerationError::Timeout(duration),
            LlmError::InvalidResponse(message) => GenerationError::InvalidResponse(message),
            other => GenerationError::Provider(other.to_string()),
        }
    }
}
