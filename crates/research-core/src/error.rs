//! Error types for research agents

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Why a single agent attempt failed
///
/// These never abort a request; they degrade the ticker's insight.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Upstream data or model provider returned an error
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Provider answered but the response could not be used
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Agent gave up before its local deadline
    #[error("Agent timed out")]
    TimedOut,

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl AgentError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::InvalidResponse(_))
    }
}
