//! Fetch strategy router.
//!
//! Every intercepted request is classified on two axes (navigation or
//! subresource, same- or cross-origin) and served by the strategy the
//! [`RouteTable`] names for that cell. No state is shared across requests
//! apart from the cache store.
//!
//! Non-GET requests skip the table and go straight to the network.

pub mod classify;

use std::sync::Arc;

use shellcache_core::{AppConfig, Error, Namespace, Response, RouteTable, Strategy};
use url::Url;

pub use classify::{RequestClass, classify};

use crate::fetch::{FetchError, Fetcher, Request, RequestMode, resolve};

/// Table-driven caching strategy engine.
#[derive(Clone)]
pub struct Router {
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    table: RouteTable,
    app_shell: Url,
    offline: Url,
}

impl Router {
    pub fn new(fetcher: Arc<dyn Fetcher>, origin: Url, table: RouteTable, app_shell: Url, offline: Url) -> Self {
        Self { fetcher, origin, table, app_shell, offline }
    }

    /// Build from configuration, resolving the shell and offline documents against the origin.
    pub fn from_config(fetcher: Arc<dyn Fetcher>, config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let app_shell = resolve(&origin, &config.app_shell_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let offline = resolve(&origin, &config.offline_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(fetcher, origin, config.routes, app_shell, offline))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Strategy that would serve `request`. `None` for requests that bypass the router.
    pub fn strategy_for(&self, request: &Request) -> Option<Strategy> {
        let class = classify(request, &self.origin);
        class
            .cacheable_method
            .then(|| self.table.lookup(class.navigation, class.same_origin))
    }

    /// Serve `request` against `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NetworkFailure`] or [`Error::CorsRejected`] only when
    /// the strategy has no cached fallback. Navigations always resolve.
    pub async fn handle(&self, namespace: &Namespace, request: Request) -> Result<Response, Error> {
        let Some(strategy) = self.strategy_for(&request) else {
            return self.passthrough(&request).await;
        };

        tracing::debug!(url = %request.url, strategy = ?strategy, "routing request");

        match strategy {
            Strategy::AppShell => Ok(self.app_shell(namespace, &request).await),
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(namespace, &request).await,
            Strategy::CacheFirst => self.cache_first(namespace, &request).await,
            Strategy::NetworkFirst => self.network_first(namespace, &request).await,
            Strategy::NetworkOnly => network(self.fetcher.as_ref(), &request).await.map_err(Error::from),
        }
    }

    /// Forward to the network untouched. Never cached.
    pub async fn passthrough(&self, request: &Request) -> Result<Response, Error> {
        self.fetcher.fetch(request).await.map_err(Error::from)
    }

    async fn app_shell(&self, namespace: &Namespace, request: &Request) -> Response {
        if let Some(hit) = lookup(namespace, request.key()).await {
            return hit;
        }
        if let Some(shell) = lookup(namespace, self.app_shell.as_str()).await {
            return shell;
        }

        match network(self.fetcher.as_ref(), request).await {
            Ok(response) => {
                store(namespace, request.key(), &response).await;
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "navigation offline; serving offline document");
                match lookup(namespace, self.offline.as_str()).await {
                    Some(offline) => offline,
                    None => Response::offline_unavailable(),
                }
            }
        }
    }

    async fn stale_while_revalidate(&self, namespace: &Namespace, request: &Request) -> Result<Response, Error> {
        if let Some(hit) = lookup(namespace, request.key()).await {
            self.revalidate(namespace, request);
            return Ok(hit);
        }

        let response = network(self.fetcher.as_ref(), request).await?;
        store(namespace, request.key(), &response).await;
        Ok(response)
    }

    async fn cache_first(&self, namespace: &Namespace, request: &Request) -> Result<Response, Error> {
        if let Some(hit) = lookup(namespace, request.key()).await {
            return Ok(hit);
        }

        let response = network(self.fetcher.as_ref(), request).await?;
        store(namespace, request.key(), &response).await;
        Ok(response)
    }

    async fn network_first(&self, namespace: &Namespace, request: &Request) -> Result<Response, Error> {
        match network(self.fetcher.as_ref(), request).await {
            Ok(response) => {
                store(namespace, request.key(), &response).await;
                Ok(response)
            }
            Err(e) => lookup(namespace, request.key()).await.ok_or_else(|| e.into()),
        }
    }

    /// Refresh the entry for `request` in a detached task.
    ///
    /// The caller never waits on it and its failures are discarded.
    fn revalidate(&self, namespace: &Namespace, request: &Request) {
        let fetcher = Arc::clone(&self.fetcher);
        let namespace = namespace.clone();
        let request = request.clone();

        tokio::spawn(async move {
            match network(fetcher.as_ref(), &request).await {
                Ok(response) if response.is_cacheable() => {
                    if let Err(e) = namespace.put(request.key(), &response).await {
                        tracing::debug!(url = %request.url, error = %e, "background refresh not stored");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "background refresh uncacheable");
                }
                Err(e) => tracing::debug!(url = %request.url, error = %e, "background refresh failed"),
            }
        });
    }
}

/// Fetch from the network, retrying a CORS rejection once in no-cors mode.
async fn network(fetcher: &dyn Fetcher, request: &Request) -> Result<Response, FetchError> {
    match fetcher.fetch(request).await {
        Err(FetchError::Cors(reason)) if request.mode == RequestMode::Cors => {
            tracing::debug!(url = %request.url, reason = %reason, "cors rejected; retrying as no-cors");
            fetcher.fetch(&request.clone().with_mode(RequestMode::NoCors)).await
        }
        other => other,
    }
}

/// Cache read that degrades to a miss on store errors.
async fn lookup(namespace: &Namespace, key: &str) -> Option<Response> {
    match namespace.match_url(key).await {
        Ok(hit) => hit.map(|entry| entry.response),
        Err(e) => {
            tracing::warn!(url = key, error = %e, "cache read failed; treating as miss");
            None
        }
    }
}

/// Cache write that never fails the request.
async fn store(namespace: &Namespace, key: &str, response: &Response) {
    if !response.is_cacheable() {
        return;
    }
    if let Err(e) = namespace.put(key, response).await {
        tracing::warn!(url = key, error = %e, "cache write failed; response still delivered");
    }
}
