//! resource_fetch tool implementation.
//!
//! Issues a request through the interceptor as a page would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{ClientId, Method, Request, RequestMode};
use shellcache_core::Error;

use super::json_result;
use crate::state::AppState;

/// Input parameters for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// URL to request. Relative URLs resolve against the configured origin.
    pub url: String,

    /// Request mode: "navigate", "same-origin", "cors" (default) or "no-cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// HTTP method (default: GET). Anything else bypasses the cache.
    #[serde(default)]
    pub method: Option<String>,

    /// Request body for non-GET requests.
    #[serde(default)]
    pub body: Option<String>,

    /// Page issuing the request, from client_connect. Omit to use the active version.
    #[serde(default)]
    pub client_id: Option<u64>,
}

/// Output structure for the resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchOutput {
    pub url: String,
    /// HTTP status. 0 for opaque responses.
    pub status: u16,
    /// Whether the body is an opaque cross-origin response.
    pub opaque: bool,
    pub content_type: Option<String>,
    /// Body size in bytes.
    pub size: usize,
    /// Body as UTF-8 text. Absent for opaque responses.
    pub body: Option<String>,
}

fn parse_mode(mode: Option<&str>) -> Result<RequestMode, Error> {
    match mode.unwrap_or("cors") {
        "navigate" => Ok(RequestMode::Navigate),
        "same-origin" => Ok(RequestMode::SameOrigin),
        "cors" => Ok(RequestMode::Cors),
        "no-cors" => Ok(RequestMode::NoCors),
        other => Err(Error::InvalidInput(format!("unsupported mode: {other}"))),
    }
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl(state: &AppState, params: ResourceFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mode = parse_mode(params.mode.as_deref())?;
    let method = params
        .method
        .as_deref()
        .unwrap_or("GET")
        .to_ascii_uppercase()
        .parse::<Method>()
        .map_err(|e| Error::InvalidInput(format!("invalid method: {e}")))?;

    let request = Request::parse(state.interceptor.router().origin(), &params.url, mode)
        .map_err(|e| Error::InvalidUrl(e.to_string()))?
        .with_method(method, params.body.map(Into::into));
    let url = request.url.to_string();

    let response = state.interceptor.intercept(params.client_id.map(ClientId), request).await?;

    let output = ResourceFetchOutput {
        url,
        status: response.status,
        opaque: response.opaque,
        content_type: response.content_type().map(str::to_string),
        size: response.body.len(),
        body: (!response.opaque).then(|| String::from_utf8_lossy(&response.body).into_owned()),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{fetcher, installed, ok, output, state};

    fn params(url: &str, mode: &str) -> ResourceFetchParams {
        ResourceFetchParams { url: url.into(), mode: Some(mode.into()), method: None, body: None, client_id: None }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let state = state(fetcher()).await;
        assert!(fetch_impl(&state, params("", "cors")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_bad_mode() {
        let state = state(fetcher()).await;
        let err = fetch_impl(&state, params("/x", "teleport")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_navigation_served_offline() {
        let fetcher = fetcher();
        let state = installed(fetcher.clone()).await;
        fetcher.set_offline(true);

        let result = fetch_impl(&state, params("/settings", "navigate")).await.unwrap();
        let out: ResourceFetchOutput = output(&result);

        assert_eq!(out.status, 200);
        assert_eq!(out.body.as_deref(), Some("<shell>"));
    }

    #[tokio::test]
    async fn test_opaque_body_hidden() {
        let fetcher = fetcher();
        let state = installed(fetcher).await;

        let result = fetch_impl(&state, params("https://cdn.example/a.woff2", "cors")).await.unwrap();
        let out: ResourceFetchOutput = output(&result);

        assert!(out.opaque);
        assert_eq!(out.status, 0);
        assert!(out.body.is_none());
        assert_eq!(out.size, 1);
    }

    #[tokio::test]
    async fn test_post_not_cached() {
        let fetcher = fetcher();
        fetcher.set_response("https://app.example/api", ok("done"));
        let state = installed(fetcher).await;

        let mut p = params("/api", "same-origin");
        p.method = Some("post".into());
        p.body = Some("{}".into());
        fetch_impl(&state, p).await.unwrap();

        let ns = state.registration().active_namespace().await.unwrap();
        assert!(!ns.contains("https://app.example/api").await.unwrap());
    }
}
