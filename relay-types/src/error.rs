//! Error type shared by every remote assistant operation.

use std::time::Duration;

/// Errors from the remote assistant service or the stream it returns.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Retryable errors
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Rate limited by the service.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if the service provided one.
        retry_after: Option<Duration>,
    },
    /// Service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal errors
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or rejected request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Assistant, thread or message does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The service answered with a body this client cannot decode.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    // Catch-all
    /// The response stream broke or carried undecodable bytes.
    #[error("stream error: {0}")]
    Stream(String),
    /// Any other error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    /// Whether this error is likely transient and the call can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::RateLimit { .. }
                | Self::ServiceUnavailable(_)
                | Self::Stream(_)
        )
    }
}
