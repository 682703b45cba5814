//! Install-time population of a version's namespace.
//!
//! Critical assets are all-or-nothing: every one is fetched before any is
//! written, and the batch is committed in a single transaction. Optional
//! assets are fetched concurrently and each failure is isolated.

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, Namespace, PrecacheManifest, Response};
use url::Url;

use crate::fetch::{Fetcher, Request, RequestMode, fetch_with_opaque_fallback, is_same_origin, resolve};

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub version: String,
    /// Cache keys of stored critical assets, in manifest order.
    pub critical: Vec<String>,
    /// Cache keys of stored optional assets, in manifest order.
    pub optional: Vec<String>,
    /// Optional assets that could not be fetched or stored.
    pub optional_failed: Vec<String>,
}

/// Fetches a [`PrecacheManifest`] into a namespace.
#[derive(Clone)]
pub struct PrecacheLoader {
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
}

impl PrecacheLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, origin: Url) -> Self {
        Self { fetcher, origin }
    }

    /// Run the install for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallAborted`] if any critical asset fails to
    /// resolve, fetch, return a 2xx status, or be stored. No critical entry
    /// is written in that case.
    pub async fn install(&self, namespace: &Namespace, manifest: &PrecacheManifest) -> Result<InstallReport, Error> {
        tracing::info!(
            version = namespace.name(),
            critical = manifest.critical.len(),
            optional = manifest.optional.len(),
            "precache started"
        );

        let staged = try_join_all(manifest.critical.iter().map(|raw| self.fetch_critical(raw))).await?;
        let critical: Vec<String> = staged.iter().map(|(url, _)| url.clone()).collect();

        namespace
            .seal_install(staged)
            .await
            .map_err(|e| Error::InstallAborted(format!("failed to store critical assets: {e}")))?;

        let results = join_all(manifest.optional.iter().map(|raw| self.fetch_optional(namespace, raw))).await;

        let mut optional = Vec::new();
        let mut optional_failed = Vec::new();
        for (raw, result) in manifest.optional.iter().zip(results) {
            match result {
                Ok(url) => optional.push(url),
                Err(e) => {
                    tracing::warn!(url = %raw, error = %e, "optional asset skipped");
                    optional_failed.push(raw.clone());
                }
            }
        }

        tracing::info!(
            version = namespace.name(),
            critical = critical.len(),
            optional = optional.len(),
            optional_failed = optional_failed.len(),
            "precache complete"
        );

        Ok(InstallReport { version: namespace.name().to_string(), critical, optional, optional_failed })
    }

    async fn fetch_critical(&self, raw: &str) -> Result<(String, Response), Error> {
        let url = resolve(&self.origin, raw).map_err(|e| Error::InstallAborted(format!("{raw}: {e}")))?;
        let mode = if is_same_origin(&url, &self.origin) { RequestMode::SameOrigin } else { RequestMode::Cors };

        let response = self
            .fetcher
            .fetch(&Request::get(url.clone()).with_mode(mode))
            .await
            .map_err(|e| Error::InstallAborted(format!("{url}: {e}")))?;

        if !response.is_ok() {
            return Err(Error::InstallAborted(format!("{url}: status {}", response.status)));
        }

        Ok((url.to_string(), response))
    }

    async fn fetch_optional(&self, namespace: &Namespace, raw: &str) -> Result<String, Error> {
        let url = resolve(&self.origin, raw).map_err(|e| Error::OptionalAsset(format!("{raw}: {e}")))?;
        let response = fetch_with_opaque_fallback(self.fetcher.as_ref(), &url)
            .await
            .map_err(|e| Error::OptionalAsset(format!("{url}: {e}")))?;

        namespace
            .put(url.as_str(), &response)
            .await
            .map_err(|e| Error::OptionalAsset(format!("{url}: {e}")))?;

        Ok(url.to_string())
    }
}
