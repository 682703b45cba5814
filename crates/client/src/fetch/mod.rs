//! Network fetch layer.
//!
//! ### Request modes
//! - `navigate` and same-origin requests return transparent responses.
//! - `cors` cross-origin requests send an `Origin` header and are rejected
//!   unless the response carries a matching `Access-Control-Allow-Origin`.
//! - `no-cors` cross-origin requests always resolve to an opaque response.
//!
//! Credentials are never attached: the client has no cookie store.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)

pub mod error;
pub mod request;
pub mod url;

use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use error::FetchError;
pub use request::{Request, RequestMode};
pub use self::url::{UrlError, is_same_origin, resolve};

use shellcache_core::{AppConfig, Error, Response};

/// Network capability the interceptor forwards requests to.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. Terminal HTTP statuses, including errors, are `Ok`.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the application runs on; decides what counts as cross-origin.
    pub origin: ::url::Url,

    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 15s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Build from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
        })
    }
}

/// reqwest-backed [`Fetcher`] emulating browser CORS visibility rules.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = client_builder(&config)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    #[cfg(test)]
    pub(crate) fn with_client(http: Client, config: FetchConfig) -> Self {
        Self { http, config }
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn cors_allowed(&self, headers: &header::HeaderMap) -> bool {
        let origin = self.config.origin.origin().ascii_serialization();
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "*" || v == origin)
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let start = Instant::now();
        let cross_origin = !is_same_origin(&request.url, &self.config.origin);

        if cross_origin && request.mode == RequestMode::SameOrigin {
            return Err(FetchError::Cors(format!("{} is not same-origin", request.url)));
        }

        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        if cross_origin && request.mode == RequestMode::Cors {
            builder = builder.header(header::ORIGIN, self.config.origin.origin().ascii_serialization());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = response.headers().clone();
        if cross_origin && request.mode == RequestMode::Cors && !self.cors_allowed(&headers) {
            return Err(FetchError::Cors(format!("{} has no matching Access-Control-Allow-Origin", request.url)));
        }

        let bytes: Bytes = response.bytes().await?;
        if bytes.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            url = %request.url,
            mode = ?request.mode,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        if cross_origin && request.mode == RequestMode::NoCors {
            return Ok(Response::opaque(bytes));
        }

        let headers = headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        Ok(Response::new(status.as_u16(), headers, bytes))
    }
}

fn client_builder(config: &FetchConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true)
}

/// Fetch `url` CORS-enabled, retrying once in `no-cors` mode.
///
/// The first attempt counts as failed when it errors or returns an
/// uncacheable status. The retry accepts an opaque result.
pub async fn fetch_with_opaque_fallback(fetcher: &dyn Fetcher, url: &::url::Url) -> Result<Response, FetchError> {
    let request = Request::get(url.clone());
    match fetcher.fetch(&request).await {
        Ok(resp) if resp.is_cacheable() => return Ok(resp),
        Ok(resp) => tracing::warn!(url = %url, status = resp.status, "cors fetch not ok; retrying as no-cors"),
        Err(e) => tracing::warn!(url = %url, error = %e, "cors fetch failed; retrying as no-cors"),
    }

    let resp = fetcher.fetch(&request.with_mode(RequestMode::NoCors)).await?;
    if resp.is_cacheable() { Ok(resp) } else { Err(FetchError::Status(resp.status)) }
}
