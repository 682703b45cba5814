//! Intercepted request model.

use bytes::Bytes;
use reqwest::Method;
use url::Url;

use super::url::{UrlError, resolve};

/// Request mode, mirroring how the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page load.
    Navigate,
    /// Same-origin only.
    SameOrigin,
    /// Cross-origin with CORS visibility.
    Cors,
    /// Cross-origin without visibility; the response is opaque.
    NoCors,
}

/// A resource request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub mode: RequestMode,
    pub body: Option<Bytes>,
}

impl Request {
    /// A GET subresource request in CORS mode.
    pub fn get(url: Url) -> Self {
        Self { url, method: Method::GET, mode: RequestMode::Cors, body: None }
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self { url, method: Method::GET, mode: RequestMode::Navigate, body: None }
    }

    /// Resolve `input` against `origin` and build a request for it.
    pub fn parse(origin: &Url, input: &str, mode: RequestMode) -> Result<Self, UrlError> {
        let url = resolve(origin, input)?;
        Ok(Self { url, method: Method::GET, mode, body: None })
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_method(mut self, method: Method, body: Option<Bytes>) -> Self {
        self.method = method;
        self.body = body;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Cache key for this request.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }
}
