//! client_connect and client_disconnect tool implementations.
//!
//! A connected client stands in for an open page. Its controller decides which
//! version's namespace serves its requests.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::ClientId;

use super::json_result;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectOutput {
    pub client_id: u64,
    /// Version controlling the new client. Absent until a version activates.
    pub controller: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientDisconnectParams {
    pub client_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientDisconnectOutput {
    /// Version activated because this was the last client holding it back.
    pub activated: Option<String>,
    /// Namespaces retired by that activation.
    pub retired: Vec<String>,
}

pub async fn connect_impl(state: &AppState, _params: ClientConnectParams) -> Result<CallToolResult, McpError> {
    let registration = state.registration();
    let id = registration.connect_client().await;
    let controller = registration.controller(id).await;

    tracing::debug!(client = id.0, controller = ?controller, "client connected");

    json_result(&ClientConnectOutput { client_id: id.0, controller })
}

pub async fn disconnect_impl(state: &AppState, params: ClientDisconnectParams) -> Result<CallToolResult, McpError> {
    let activation = state.registration().disconnect_client(ClientId(params.client_id)).await?;

    let output = match activation {
        Some(a) => ClientDisconnectOutput { activated: Some(a.version), retired: a.retired },
        None => ClientDisconnectOutput { activated: None, retired: Vec::new() },
    };

    json_result(&output)
}
