//! offline_groups and offline_download tool implementations.
//!
//! Lists the configured resource groups with their inferred status, and
//! downloads a group into the active version's namespace.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{GroupState, GroupStatus};
use shellcache_core::Error;

use super::json_result;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OfflineGroupsParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineDownloadParams {
    /// Label of the resource group, as listed by offline_groups.
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GroupSummary {
    pub label: String,
    pub urls: Vec<String>,
    /// One of "idle", "loading", "cached", "error".
    pub status: String,
    /// Percentage, 0 to 100.
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineGroupsOutput {
    pub groups: Vec<GroupSummary>,
}

fn status_name(status: GroupStatus) -> &'static str {
    match status {
        GroupStatus::Idle => "idle",
        GroupStatus::Loading => "loading",
        GroupStatus::Cached => "cached",
        GroupStatus::Error => "error",
    }
}

fn summary(label: &str, urls: &[String], state: GroupState) -> GroupSummary {
    GroupSummary {
        label: label.to_string(),
        urls: urls.to_vec(),
        status: status_name(state.status).to_string(),
        progress: state.progress,
    }
}

/// Implementation of the offline_groups tool.
///
/// Peeks every group against the active namespace; without an active version
/// the last known states are reported.
pub async fn groups_impl(state: &AppState, _params: OfflineGroupsParams) -> Result<CallToolResult, McpError> {
    let namespace = match state.registration().active_namespace().await {
        Ok(ns) => Some(ns),
        Err(Error::NotActive) => None,
        Err(e) => return Err(e.into()),
    };

    let mut groups = Vec::with_capacity(state.groups.len());
    for group in &state.groups {
        let current = match &namespace {
            Some(ns) => state.downloader.peek(ns, group).await?,
            None => group.state(),
        };
        groups.push(summary(group.label(), group.urls(), current));
    }

    json_result(&OfflineGroupsOutput { groups })
}

/// Implementation of the offline_download tool.
pub async fn download_impl(state: &AppState, params: OfflineDownloadParams) -> Result<CallToolResult, McpError> {
    let group = state.group(&params.label)?;
    let namespace = state.registration().active_namespace().await?;

    let result = state.downloader.download(&namespace, group).await?;

    json_result(&summary(group.label(), group.urls(), result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{fetcher, installed, output, state};

    #[tokio::test]
    async fn test_groups_idle_before_download() {
        let state = installed(fetcher()).await;

        let out: OfflineGroupsOutput = output(&groups_impl(&state, OfflineGroupsParams {}).await.unwrap());

        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].status, "idle");
    }

    #[tokio::test]
    async fn test_download_then_groups_cached() {
        let state = installed(fetcher()).await;

        let result = download_impl(&state, OfflineDownloadParams { label: "Fonts".into() }).await.unwrap();
        let out: GroupSummary = output(&result);
        assert_eq!(out.status, "cached");
        assert_eq!(out.progress, 100);

        let ns = state.registration().active_namespace().await.unwrap();
        assert!(ns.contains("https://cdn.example/b.woff2").await.unwrap());
    }

    #[tokio::test]
    async fn test_peek_survives_restart() {
        let fetcher = fetcher();
        let state = installed(fetcher.clone()).await;
        download_impl(&state, OfflineDownloadParams { label: "Fonts".into() }).await.unwrap();

        let db = state.registration().db().clone();
        let restarted = crate::state::AppState::new(state.config.clone(), db, fetcher).unwrap();
        restarted.install_configured().await.unwrap();

        let out: OfflineGroupsOutput = output(&groups_impl(&restarted, OfflineGroupsParams {}).await.unwrap());
        assert_eq!(out.groups[0].status, "cached");
    }

    #[tokio::test]
    async fn test_download_unknown_group() {
        let state = installed(fetcher()).await;
        let err = download_impl(&state, OfflineDownloadParams { label: "Nope".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32027);
    }

    #[tokio::test]
    async fn test_download_without_active_version() {
        let state = state(fetcher()).await;
        let err = download_impl(&state, OfflineDownloadParams { label: "Fonts".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32025);
    }
}
