//! Error handling for the vectormesh proxy tier
//!
//! Provides a unified error type and result type shared across proxy components.

/// Result type alias for proxy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the proxy tier
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No viable target remains for a request
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Failure reaching a remote component
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a service-unavailable error
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ServiceUnavailable(_) | Error::Transport(_) | Error::Timeout(_)
        )
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::ServiceUnavailable(_) => "service_unavailable",
            Error::Transport(_) => "transport",
            Error::Timeout(_) => "timeout",
            Error::InvalidConfiguration(_) => "configuration",
            Error::Internal(_) => "internal",
        }
    }
}
