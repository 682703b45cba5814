//! Shared server state.
//!
//! One registration, one router and one set of resource groups per process,
//! all backed by the same cache database.

use std::sync::Arc;

use shellcache_client::{BulkDownloader, Fetcher, Interceptor, PrecacheLoader, Registration, ResourceGroup, Router};
use shellcache_core::{AppConfig, CacheDb, Error};

pub struct AppState {
    pub config: AppConfig,
    pub interceptor: Interceptor,
    pub downloader: BulkDownloader,
    pub groups: Vec<ResourceGroup>,
}

impl AppState {
    /// Wire every component around `db` and `fetcher`.
    pub fn new(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let loader = PrecacheLoader::new(Arc::clone(&fetcher), origin.clone());
        let registration = Arc::new(Registration::new(db, loader, config.skip_waiting));
        let router = Router::from_config(Arc::clone(&fetcher), &config)?;
        let downloader = BulkDownloader::new(fetcher, origin, config.peek_mode);
        let groups = config.resource_groups.iter().map(ResourceGroup::from_config).collect();

        Ok(Self { interceptor: Interceptor::new(registration, router), downloader, groups, config })
    }

    pub fn registration(&self) -> &Registration {
        self.interceptor.registration()
    }

    pub fn group(&self, label: &str) -> Result<&ResourceGroup, Error> {
        self.groups
            .iter()
            .find(|g| g.label() == label)
            .ok_or_else(|| Error::UnknownGroup(label.to_string()))
    }

    /// Resume the stored version, then install the configured one.
    ///
    /// A failed install leaves the resumed version serving.
    pub async fn install_configured(&self) -> Result<(), Error> {
        let registration = self.registration();
        registration.resume().await?;
        registration
            .install(&self.config.version, &self.config.manifest)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rmcp::model::CallToolResult;
    use shellcache_client::testing::ScriptedFetcher;
    use shellcache_core::{PrecacheManifest, ResourceGroupConfig, Response};

    pub const ORIGIN: &str = "https://app.example/";

    pub fn ok(body: &str) -> Response {
        Response::new(200, vec![("content-type".into(), "text/html".into())], body.to_string())
    }

    pub fn config() -> AppConfig {
        AppConfig {
            version: "v1".into(),
            origin: ORIGIN.into(),
            manifest: PrecacheManifest { critical: vec!["./index.html".into(), "./offline.html".into()], optional: vec![] },
            resource_groups: vec![ResourceGroupConfig {
                label: "Fonts".into(),
                urls: vec!["https://cdn.example/a.woff2".into(), "https://cdn.example/b.woff2".into()],
            }],
            ..AppConfig::default()
        }
    }

    pub fn fetcher() -> Arc<ScriptedFetcher> {
        Arc::new(
            ScriptedFetcher::new()
                .with_response("https://app.example/index.html", ok("<shell>"))
                .with_response("https://app.example/offline.html", ok("<offline>"))
                .with_cors_rejection("https://cdn.example/a.woff2", "a")
                .with_cors_rejection("https://cdn.example/b.woff2", "b"),
        )
    }

    pub async fn state(fetcher: Arc<ScriptedFetcher>) -> AppState {
        let db = CacheDb::open_in_memory().await.unwrap();
        AppState::new(config(), db, fetcher).unwrap()
    }

    pub async fn installed(fetcher: Arc<ScriptedFetcher>) -> AppState {
        let state = state(fetcher).await;
        state.install_configured().await.unwrap();
        state
    }

    /// Deserialize the JSON text payload of a tool result.
    pub fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
