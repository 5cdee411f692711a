//! Error types for research requests

use crate::models::RequestState;
use std::time::Duration;
use thiserror::Error;

/// Request-level failures
///
/// Per-agent failures never show up here: they are absorbed into degraded
/// insights. Everything below aborts the whole request.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Query rejected before any work started
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The query contains no recognizable ticker symbol
    #[error("No valid stock tickers found in query")]
    NoTickersFound,

    /// The request deadline passed before completion
    #[error("Analysis timed out after {:.3}s", .timeout.as_secs_f64())]
    RequestTimedOut { timeout: Duration },

    /// Cancelled by an external request
    #[error("Analysis {request_id} was cancelled")]
    Cancelled { request_id: String },

    /// Unknown request identifier
    #[error("Analysis request not found: {request_id}")]
    StatusNotFound { request_id: String },

    /// The request already reached a terminal state
    #[error("Analysis {request_id} is already {status}")]
    AlreadyTerminal {
        request_id: String,
        status: RequestState,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected fault in orchestration itself
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by transport layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Conventional HTTP status code for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 422,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Timeout => 504,
            Self::Cancelled => 499,
            Self::Internal => 500,
        }
    }

    /// Whether the caller, not the service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation | Self::NotFound | Self::Conflict)
    }
}

impl ResearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuery(_) | Self::NoTickersFound => ErrorKind::Validation,
            Self::StatusNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyTerminal { .. } => ErrorKind::Conflict,
            Self::RequestTimedOut { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(request_id: &str) -> Self {
        Self::StatusNotFound {
            request_id: request_id.to_string(),
        }
    }
}

/// Result type alias for research operations
pub type Result<T> = std::result::Result<T, ResearchError>;

impl From<research_utils::EnvError> for ResearchError {
    fn from(err: research_utils::EnvError) -> Self {
        ResearchError::Config(err.to_string())
    }
}
