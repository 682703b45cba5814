//! User-invoked bulk download of resource groups.
//!
//! A [`ResourceGroup`] owns its observable state. Collaborators subscribe to
//! it to render progress; only [`BulkDownloader`] mutates it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shellcache_core::{Error, Namespace, PeekMode, ResourceGroupConfig};
use tokio::sync::watch;
use url::Url;

use crate::fetch::{Fetcher, fetch_with_opaque_fallback, resolve};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    #[default]
    Idle,
    Loading,
    Cached,
    Error,
}

/// Observable state of a group. `progress` is a 0–100 percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    pub status: GroupStatus,
    pub progress: u8,
}

impl GroupState {
    fn loading(progress: u8) -> Self {
        Self { status: GroupStatus::Loading, progress }
    }

    fn cached() -> Self {
        Self { status: GroupStatus::Cached, progress: 100 }
    }
}

/// A named bundle of URLs downloadable as a unit.
#[derive(Debug)]
pub struct ResourceGroup {
    label: String,
    urls: Vec<String>,
    state: watch::Sender<GroupState>,
}

impl ResourceGroup {
    pub fn new(label: impl Into<String>, urls: Vec<String>) -> Self {
        Self { label: label.into(), urls, state: watch::Sender::new(GroupState::default()) }
    }

    pub fn from_config(config: &ResourceGroupConfig) -> Self {
        Self::new(config.label.clone(), config.urls.clone())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Current state.
    pub fn state(&self) -> GroupState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GroupState> {
        self.state.subscribe()
    }

    fn set(&self, state: GroupState) {
        self.state.send_replace(state);
    }
}

/// Percentage of `completed` out of `total`, rounded half up.
fn progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (completed * 100 + total / 2) / total;
    u8::try_from(pct.min(100)).unwrap_or(100)
}

/// Eagerly populates the store with resource groups.
#[derive(Clone)]
pub struct BulkDownloader {
    fetcher: Arc<dyn Fetcher>,
    origin: Url,
    peek_mode: PeekMode,
}

impl BulkDownloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, origin: Url, peek_mode: PeekMode) -> Self {
        Self { fetcher, origin, peek_mode }
    }

    /// Infer whether `group` is already downloaded, without touching the network.
    ///
    /// Marks the group cached when the probed URLs are present. Never moves a
    /// group out of `loading`, and never demotes a group.
    pub async fn peek(&self, namespace: &Namespace, group: &ResourceGroup) -> Result<GroupState, Error> {
        let probe: &[String] = match self.peek_mode {
            PeekMode::FirstUrl => group.urls.get(..1).unwrap_or_default(),
            PeekMode::AllUrls => &group.urls,
        };
        if probe.is_empty() {
            return Ok(group.state());
        }

        let mut present = true;
        for raw in probe {
            let url = resolve(&self.origin, raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
            if !namespace.contains(url.as_str()).await? {
                present = false;
                break;
            }
        }

        if present && group.state().status == GroupStatus::Idle {
            group.set(GroupState::cached());
        }
        Ok(group.state())
    }

    /// Download every URL of `group` into `namespace`, in order.
    ///
    /// Re-invocation repeats all URLs.
    ///
    /// # Errors
    ///
    /// Returns the first fetch or store failure; the group is left in `error`.
    /// Returns [`Error::InvalidInput`] if the group is already loading.
    pub async fn download(&self, namespace: &Namespace, group: &ResourceGroup) -> Result<GroupState, Error> {
        let mut started = false;
        group.state.send_if_modified(|state| {
            if state.status == GroupStatus::Loading {
                return false;
            }
            *state = GroupState::loading(0);
            started = true;
            true
        });
        if !started {
            return Err(Error::InvalidInput(format!("group '{}' is already downloading", group.label)));
        }

        tracing::info!(group = %group.label, urls = group.urls.len(), "bulk download started");

        let total = group.urls.len();
        for (i, raw) in group.urls.iter().enumerate() {
            if let Err(e) = self.download_one(namespace, raw).await {
                tracing::warn!(group = %group.label, url = %raw, error = %e, "bulk download failed");
                group.set(GroupState { status: GroupStatus::Error, progress: group.state().progress });
                return Err(e);
            }
            group.set(GroupState::loading(progress(i + 1, total)));
        }

        group.set(GroupState::cached());
        tracing::info!(group = %group.label, "bulk download complete");
        Ok(group.state())
    }

    async fn download_one(&self, namespace: &Namespace, raw: &str) -> Result<(), Error> {
        let url = resolve(&self.origin, raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
        let response = fetch_with_opaque_fallback(self.fetcher.as_ref(), &url).await?;
        namespace.put(url.as_str(), &response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFetcher;
    use shellcache_core::{CacheDb, Response};

    const ORIGIN: &str = "https://app.example/";

    fn downloader(fetcher: Arc<ScriptedFetcher>, peek_mode: PeekMode) -> BulkDownloader {
        BulkDownloader::new(fetcher, Url::parse(ORIGIN).unwrap(), peek_mode)
    }

    fn group(urls: &[&str]) -> ResourceGroup {
        ResourceGroup::new("Fonts", urls.iter().map(|s| s.to_string()).collect())
    }

    async fn namespace() -> Namespace {
        CacheDb::open_in_memory().await.unwrap().open_namespace("v1").await.unwrap()
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(progress(1, 3), 33);
        assert_eq!(progress(2, 3), 67);
        assert_eq!(progress(3, 3), 100);
        assert_eq!(progress(1, 8), 13);
        assert_eq!(progress(0, 0), 100);
    }

    #[tokio::test]
    async fn test_download_reports_progress() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .with_response("https://cdn.example/a.js", Response::new(200, vec![], "a"))
                .with_cors_rejection("https://cdn.example/b.js", "b")
                .with_response("https://cdn.example/c.js", Response::new(200, vec![], "c")),
        );
        let ns = namespace().await;
        let group = group(&["https://cdn.example/a.js", "https://cdn.example/b.js", "https://cdn.example/c.js"]);
        let mut rx = group.subscribe();

        let dl = downloader(fetcher, PeekMode::FirstUrl);
        let task = {
            let ns = ns.clone();
            async move { dl.download(&ns, &group).await.map(|s| (s, group)) }
        };
        let watcher = async {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                seen.push(state);
                if state.status != GroupStatus::Loading {
                    break;
                }
            }
            seen
        };

        let (result, seen) = tokio::join!(task, watcher);
        let (final_state, _group) = result.unwrap();

        assert_eq!(final_state, GroupState { status: GroupStatus::Cached, progress: 100 });
        assert_eq!(seen.last(), Some(&final_state));
        let progresses: Vec<u8> = seen.iter().map(|s| s.progress).collect();
        assert!(progresses.windows(2).all(|w| w[0] <= w[1]));
        assert!(ns.match_url("https://cdn.example/b.js").await.unwrap().unwrap().response.opaque);
    }

    #[tokio::test]
    async fn test_download_failure_sets_error() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .with_response("https://cdn.example/a.woff2", Response::new(200, vec![], "a"))
                .with_response("https://cdn.example/c.woff2", Response::new(200, vec![], "c")),
        );
        let ns = namespace().await;
        let group = group(&["https://cdn.example/a.woff2", "https://cdn.example/b.woff2", "https://cdn.example/c.woff2"]);

        let result = downloader(fetcher.clone(), PeekMode::FirstUrl).download(&ns, &group).await;

        assert!(matches!(result, Err(Error::NetworkFailure(_))));
        assert_eq!(group.state(), GroupState { status: GroupStatus::Error, progress: 33 });
        assert!(ns.contains("https://cdn.example/a.woff2").await.unwrap());
        assert_eq!(fetcher.call_count("https://cdn.example/c.woff2"), 0);
    }

    #[tokio::test]
    async fn test_redownload_after_error() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ns = namespace().await;
        let group = group(&["https://cdn.example/a.css"]);
        let dl = downloader(fetcher.clone(), PeekMode::FirstUrl);

        assert!(dl.download(&ns, &group).await.is_err());
        assert_eq!(group.state().status, GroupStatus::Error);

        fetcher.set_response("https://cdn.example/a.css", Response::new(200, vec![], "a"));
        let state = dl.download(&ns, &group).await.unwrap();
        assert_eq!(state.status, GroupStatus::Cached);
    }

    #[tokio::test]
    async fn test_empty_group_is_cached() {
        let ns = namespace().await;
        let group = group(&[]);

        let state = downloader(Arc::new(ScriptedFetcher::new()), PeekMode::FirstUrl)
            .download(&ns, &group)
            .await
            .unwrap();

        assert_eq!(state, GroupState { status: GroupStatus::Cached, progress: 100 });
    }

    #[tokio::test]
    async fn test_peek_first_url_only() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ns = namespace().await;
        ns.put("https://cdn.example/a.js", &Response::new(200, vec![], "a")).await.unwrap();
        let urls = ["https://cdn.example/a.js", "https://cdn.example/b.js"];

        let first = group(&urls);
        let state = downloader(fetcher.clone(), PeekMode::FirstUrl).peek(&ns, &first).await.unwrap();
        assert_eq!(state.status, GroupStatus::Cached);

        let all = group(&urls);
        let state = downloader(fetcher.clone(), PeekMode::AllUrls).peek(&ns, &all).await.unwrap();
        assert_eq!(state.status, GroupStatus::Idle);

        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_download_rejected() {
        let fetcher = Arc::new(ScriptedFetcher::new().with_response("https://cdn.example/a.js", Response::new(200, vec![], "a")));
        fetcher.gate("https://cdn.example/a.js");
        let ns = namespace().await;
        let group = Arc::new(group(&["https://cdn.example/a.js"]));
        let dl = downloader(fetcher.clone(), PeekMode::FirstUrl);

        let first = {
            let (dl, ns, group) = (dl.clone(), ns.clone(), Arc::clone(&group));
            tokio::spawn(async move { dl.download(&ns, &group).await })
        };
        let mut rx = group.subscribe();
        rx.wait_for(|s| s.status == GroupStatus::Loading).await.unwrap();

        assert!(matches!(dl.download(&ns, &group).await, Err(Error::InvalidInput(_))));

        fetcher.release("https://cdn.example/a.js", 1);
        assert_eq!(first.await.unwrap().unwrap().status, GroupStatus::Cached);
    }
}
