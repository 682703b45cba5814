//! cache_namespaces tool implementation.
//!
//! Lists every namespace with its entry count and stored bytes.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::CacheDb;

use crate::tools::json_result;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheNamespacesParams {
    /// Include the cached URLs of each namespace.
    #[serde(default)]
    pub include_keys: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NamespaceSummary {
    pub name: String,
    pub entries: usize,
    pub usage_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheNamespacesOutput {
    pub namespaces: Vec<NamespaceSummary>,
    /// Per-namespace quota, if configured.
    pub quota_bytes: Option<u64>,
}

pub async fn namespaces_impl(cache: &CacheDb, params: CacheNamespacesParams) -> Result<CallToolResult, McpError> {
    let mut namespaces = Vec::new();
    for name in cache.namespaces().await? {
        // retired between listing and lookup
        let Some(ns) = cache.existing_namespace(&name).await? else {
            continue;
        };
        let keys = ns.keys().await?;
        let usage_bytes = ns.usage_bytes().await?;
        namespaces.push(NamespaceSummary {
            name,
            entries: keys.len(),
            usage_bytes,
            keys: params.include_keys.then_some(keys),
        });
    }

    let output = CacheNamespacesOutput { namespaces, quota_bytes: cache.quota_bytes() };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::output;
    use shellcache_core::Response;

    #[tokio::test]
    async fn test_namespaces_empty() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let result = namespaces_impl(&cache, CacheNamespacesParams::default()).await.unwrap();
        let out: CacheNamespacesOutput = output(&result);
        assert!(out.namespaces.is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_usage() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let ns = cache.open_namespace("v1").await.unwrap();
        ns.put("https://app.example/a", &Response::new(200, vec![], "abcd")).await.unwrap();
        ns.put("https://app.example/b", &Response::opaque("ef")).await.unwrap();

        let result = namespaces_impl(&cache, CacheNamespacesParams { include_keys: true }).await.unwrap();
        let out: CacheNamespacesOutput = output(&result);

        assert_eq!(out.namespaces.len(), 1);
        assert_eq!(out.namespaces[0].entries, 2);
        assert_eq!(out.namespaces[0].usage_bytes, 6);
        assert_eq!(out.namespaces[0].keys.as_ref().map(Vec::len), Some(2));
    }
}
