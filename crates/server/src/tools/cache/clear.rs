//! cache_clear tool implementation.
//!
//! User-initiated clearing: one entry, or a whole namespace.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::Error;

use crate::state::AppState;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Namespace to clear. Defaults to the active version.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Remove only this URL. Without it the whole namespace is emptied.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    pub namespace: String,
    pub url: Option<String>,
    /// Whether anything was removed.
    pub deleted: bool,
}

pub async fn clear_impl(state: &AppState, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let db = state.registration().db();
    let name = match params.namespace {
        Some(name) if !name.trim().is_empty() => name,
        Some(_) => return Err(Error::InvalidInput("namespace cannot be empty".into()).into()),
        None => state.registration().active().await.ok_or(Error::NotActive)?,
    };

    let output = match params.url {
        Some(raw) => {
            let url = shellcache_client::fetch::resolve(state.interceptor.router().origin(), &raw)
                .map_err(|e| Error::InvalidUrl(e.to_string()))?;
            let deleted = match db.existing_namespace(&name).await? {
                Some(ns) => ns.delete_entry(url.as_str()).await?,
                None => false,
            };
            CacheClearOutput { namespace: name, url: Some(url.to_string()), deleted }
        }
        None => {
            let deleted = state.registration().clear_namespace(&name).await?;
            CacheClearOutput { namespace: name, url: None, deleted }
        }
    };

    tracing::info!(namespace = %output.namespace, url = ?output.url, deleted = output.deleted, "cache cleared");

    json_result(&output)
}
