//! shellcache server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchConfig, HttpFetcher};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.version,
        origin = %config.origin,
        db = %config.db_path.display(),
        "Starting shellcache server on stdio transport"
    );

    let mut db = CacheDb::open(&config.db_path).await?;
    if let Some(quota) = config.quota_bytes {
        db = db.with_quota(quota);
    }

    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(&config)?)?);
    let state = Arc::new(state::AppState::new(config, db, fetcher)?);

    if let Err(e) = state.install_configured().await {
        tracing::error!(error = %e, "install of configured version failed; serving previous state");
    }

    let handler = handler::ShellcacheServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
