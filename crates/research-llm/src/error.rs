//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[cfg(feature = "openai")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Map provider failures onto agent failures
///
/// Everything a provider can report is a soft, per-unit failure from the
/// orchestrator's point of view. Malformed responses are kept distinct so
/// that traces say which side was at fault.
impl From<LLMError> for research_core::AgentError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::UnexpectedResponse(msg) => research_core::AgentError::InvalidResponse(msg),
            LLMError::SerializationError(e) => {
                research_core::AgentError::InvalidResponse(e.to_string())
            }
            #[cfg(feature = "openai")]
            LLMError::HttpError(e) if e.is_timeout() => research_core::AgentError::TimedOut,
            other => research_core::AgentError::Upstream(other.to_string()),
        }
    }
}
