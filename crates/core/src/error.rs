//! Unified error types for shellcache.
//!
//! Each variant carries a stable code prefix in its display form so that log
//! lines and MCP error payloads can be matched without parsing prose.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A critical manifest asset failed; the new version never activates.
    #[error("INSTALL_ABORTED: {0}")]
    InstallAborted(String),

    /// A non-critical manifest asset failed. Only ever logged.
    #[error("OPTIONAL_ASSET_FAILED: {0}")]
    OptionalAsset(String),

    /// Runtime fetch failed and no cache fallback was available.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// Store quota or write error. Never unwinds response delivery.
    #[error("CACHE_WRITE_FAILED: {0}")]
    CacheWrite(String),

    /// Cross-origin fetch rejected in cors mode.
    #[error("CORS_REJECTED: {0}")]
    CorsRejected(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given URL.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// No version has been activated yet.
    #[error("NOT_ACTIVE: no active version")]
    NotActive,

    /// `skip_waiting` was requested with nothing installed and waiting.
    #[error("NO_WAITING_VERSION")]
    NoWaitingVersion,

    /// Unknown resource group label.
    #[error("UNKNOWN_GROUP: {0}")]
    UnknownGroup(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether the error is a network-level failure that a cache fallback may recover.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkFailure(_) | Error::CorsRejected(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InstallAborted(msg) => (-32020, msg.clone()),
            Error::OptionalAsset(msg) => (-32021, msg.clone()),
            Error::NetworkFailure(msg) => (-32022, msg.clone()),
            Error::CacheWrite(msg) => (-32023, msg.clone()),
            Error::CorsRejected(msg) => (-32024, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::NotActive => (-32025, "No active version".to_string()),
            Error::NoWaitingVersion => (-32026, "No version is waiting to activate".to_string()),
            Error::UnknownGroup(msg) => (-32027, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InstallAborted("/shell.html: status 404".to_string());
        assert!(err.to_string().starts_with("INSTALL_ABORTED"));
        assert!(err.to_string().contains("/shell.html"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::NetworkFailure("offline".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32022);
    }

    #[test]
    fn test_is_network() {
        assert!(Error::NetworkFailure("x".into()).is_network());
        assert!(Error::CorsRejected("x".into()).is_network());
        assert!(!Error::CacheWrite("x".into()).is_network());
    }
}
