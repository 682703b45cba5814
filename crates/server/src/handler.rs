//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use crate::state::AppState;
use crate::tools::{
    cache::{CacheClearParams, CacheNamespacesParams, clear_impl, namespaces_impl},
    client::{ClientConnectParams, ClientDisconnectParams, connect_impl, disconnect_impl},
    offline::{OfflineDownloadParams, OfflineGroupsParams, download_impl, groups_impl},
    resource::{ResourceFetchParams, fetch_impl},
    worker::{
        WorkerSkipWaitingParams, WorkerStatusParams, WorkerUpdateParams, skip_waiting_impl, status_impl, update_impl,
    },
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellcacheServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellcacheServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    /// Request a resource through the interceptor.
    ///
    /// Navigations are served app-shell first and always resolve, falling back
    /// to the offline document. Subresources are served stale-while-revalidate.
    #[tool(description = "Fetch a resource through the offline cache, as an open page would. \
        Returns status, opacity, content type and body text.")]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Register an open page. Returns its client id and controlling version.")]
    async fn client_connect(&self, params: Parameters<ClientConnectParams>) -> Result<CallToolResult, McpError> {
        connect_impl(&self.state, params.0).await
    }

    #[tool(description = "Close a page. Activates a waiting version once no page holds the old one.")]
    async fn client_disconnect(&self, params: Parameters<ClientDisconnectParams>) -> Result<CallToolResult, McpError> {
        disconnect_impl(&self.state, params.0).await
    }

    #[tool(description = "List downloadable resource groups with their status and progress.")]
    async fn offline_groups(&self, params: Parameters<OfflineGroupsParams>) -> Result<CallToolResult, McpError> {
        groups_impl(&self.state, params.0).await
    }

    /// Download every URL of a resource group for offline use.
    #[tool(description = "Download a resource group into the cache for offline use. Aborts on the first failure.")]
    async fn offline_download(&self, params: Parameters<OfflineDownloadParams>) -> Result<CallToolResult, McpError> {
        download_impl(&self.state, params.0).await
    }

    #[tool(description = "Show the configured, active and waiting versions and connected clients.")]
    async fn worker_status(&self, params: Parameters<WorkerStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.state, params.0).await
    }

    /// Install a version from the configured precache manifest.
    #[tool(description = "Install a cache version from the precache manifest. \
        Fails without touching the active version if a critical asset cannot be fetched.")]
    async fn worker_update(&self, params: Parameters<WorkerUpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.state, params.0).await
    }

    #[tool(description = "Activate the waiting version now, claiming all open pages and retiring old caches.")]
    async fn worker_skip_waiting(
        &self, params: Parameters<WorkerSkipWaitingParams>,
    ) -> Result<CallToolResult, McpError> {
        skip_waiting_impl(&self.state, params.0).await
    }

    #[tool(description = "List cache namespaces with entry counts and stored bytes.")]
    async fn cache_namespaces(&self, params: Parameters<CacheNamespacesParams>) -> Result<CallToolResult, McpError> {
        namespaces_impl(self.state.registration().db(), params.0).await
    }

    #[tool(description = "Clear one cached URL, or a whole namespace (default: the active version).")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.state, params.0).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
