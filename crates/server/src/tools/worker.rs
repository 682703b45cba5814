//! worker_status, worker_update and worker_skip_waiting tool implementations.
//!
//! The version lifecycle as seen from the control channel.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::Error;

use super::json_result;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    /// Version this build is configured to serve.
    pub configured: String,
    pub active: Option<String>,
    pub waiting: Option<String>,
    pub clients: usize,
    pub controlled_clients: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerUpdateParams {
    /// Version to install. Defaults to the configured version.
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerUpdateOutput {
    pub version: String,
    /// False when the version was already active and nothing was fetched.
    pub installed: bool,
    pub critical: Vec<String>,
    pub optional: Vec<String>,
    pub optional_failed: Vec<String>,
    pub active: Option<String>,
    pub waiting: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSkipWaitingParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSkipWaitingOutput {
    pub version: String,
    pub retired: Vec<String>,
    pub claimed: usize,
}

pub async fn status_impl(state: &AppState, _params: WorkerStatusParams) -> Result<CallToolResult, McpError> {
    let status = state.registration().status().await;
    json_result(&WorkerStatusOutput {
        configured: state.config.version.clone(),
        active: status.active,
        waiting: status.waiting,
        clients: status.clients,
        controlled_clients: status.controlled_clients,
    })
}

/// Install a version from the configured manifest.
pub async fn update_impl(state: &AppState, params: WorkerUpdateParams) -> Result<CallToolResult, McpError> {
    let version = params.version.unwrap_or_else(|| state.config.version.clone());
    if version.trim().is_empty() {
        return Err(Error::InvalidInput("version cannot be empty".into()).into());
    }

    let registration = state.registration();
    let report = registration.install(&version, &state.config.manifest).await?;
    let status = registration.status().await;

    let output = match report {
        Some(r) => WorkerUpdateOutput {
            version: r.version,
            installed: true,
            critical: r.critical,
            optional: r.optional,
            optional_failed: r.optional_failed,
            active: status.active,
            waiting: status.waiting,
        },
        None => WorkerUpdateOutput {
            version,
            installed: false,
            critical: Vec::new(),
            optional: Vec::new(),
            optional_failed: Vec::new(),
            active: status.active,
            waiting: status.waiting,
        },
    };

    json_result(&output)
}

pub async fn skip_waiting_impl(state: &AppState, _params: WorkerSkipWaitingParams) -> Result<CallToolResult, McpError> {
    let activation = state.registration().skip_waiting().await?;
    json_result(&WorkerSkipWaitingOutput {
        version: activation.version,
        retired: activation.retired,
        claimed: activation.claimed,
    })
}
