//! Response model shared by the network layer and the cache store.
//!
//! ### Classification
//! - 2xx with a readable body: transparent. Cached and inspectable.
//! - status 0 with an unreadable body: opaque. Cached, never inspected.
//! - anything else: passed through without caching.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How a response may be treated by the caching layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Transparent,
    Opaque,
    Uncacheable,
}

/// A resource response as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status. Always 0 for opaque responses.
    pub status: u16,
    /// Response headers in arrival order. Empty for opaque responses.
    pub headers: Vec<(String, String)>,
    /// Body bytes. Carried through for opaque responses but never read.
    pub body: Bytes,
    /// Cross-origin response fetched without CORS visibility.
    pub opaque: bool,
}

impl Response {
    /// Build a transparent response.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into(), opaque: false }
    }

    /// Build an opaque response around a body the caller may not inspect.
    pub fn opaque(body: impl Into<Bytes>) -> Self {
        Self { status: 0, headers: Vec::new(), body: body.into(), opaque: true }
    }

    /// Synthetic response served when navigation has no cache and no network.
    pub fn offline_unavailable() -> Self {
        Self::new(
            503,
            vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            Bytes::from_static(b"Service Unavailable: offline"),
        )
    }

    pub fn kind(&self) -> ResponseKind {
        if self.opaque {
            ResponseKind::Opaque
        } else if (200..300).contains(&self.status) {
            ResponseKind::Transparent
        } else {
            ResponseKind::Uncacheable
        }
    }

    /// Binary "may this be stored" check.
    pub fn is_cacheable(&self) -> bool {
        self.kind() != ResponseKind::Uncacheable
    }

    /// Transparent 2xx. Opaque responses are never reported as ok since their
    /// status is unreadable.
    pub fn is_ok(&self) -> bool {
        self.kind() == ResponseKind::Transparent
    }

    /// Case-insensitive header lookup. Always `None` for opaque responses.
    pub fn header(&self, name: &str) -> Option<&str> {
        if self.opaque {
            return None;
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
