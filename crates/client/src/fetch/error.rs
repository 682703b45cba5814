//! Network fetch error types.

use shellcache_core::Error;

/// Errors from the network layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, offline.
    #[error("network error: {0}")]
    Network(String),

    /// Cross-origin response without a matching Access-Control-Allow-Origin.
    #[error("cors rejected: {0}")]
    Cors(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body over the configured limit.
    #[error("response too large: {0}")]
    TooLarge(String),

    /// Terminal response that cannot be cached where a cacheable one was required.
    #[error("HTTP status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout(err.to_string()) } else { FetchError::Network(err.to_string()) }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cors(msg) => Error::CorsRejected(msg),
            other => Error::NetworkFailure(other.to_string()),
        }
    }
}
