//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The cache version is part of this configuration. It is injected at deploy
//! time and threaded explicitly into the loader and garbage collector.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod routes;
mod validation;

pub use routes::{RouteTable, Strategy};
pub use validation::ConfigError;

/// Assets fetched at install time.
///
/// Relative URLs resolve against [`AppConfig::origin`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheManifest {
    /// Every one must be fetched and stored, or the install fails.
    #[serde(default)]
    pub critical: Vec<String>,

    /// Best-effort; individual failures are logged and skipped.
    #[serde(default)]
    pub optional: Vec<String>,
}

/// A user-facing bundle of URLs that can be downloaded on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupConfig {
    pub label: String,
    pub urls: Vec<String>,
}

/// How a group's initial status is inferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeekMode {
    /// Probe only the first URL. A partially downloaded group reports cached.
    #[default]
    FirstUrl,
    /// Probe every URL.
    AllUrls,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache namespace for this build. Must change with every deployment.
    ///
    /// Set via SHELLCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin the application is served from; relative URLs resolve against it.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Per-namespace storage quota in bytes. Unlimited when unset.
    #[serde(default)]
    pub quota_bytes: Option<u64>,

    /// Canonical app-shell document used as the navigation fallback.
    #[serde(default = "default_app_shell_url")]
    pub app_shell_url: String,

    /// Static document served when navigation has neither cache nor network.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Activate a freshly installed version without waiting for old clients to go away.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    #[serde(default = "default_manifest")]
    pub manifest: PrecacheManifest,

    #[serde(default)]
    pub routes: RouteTable,

    #[serde(default)]
    pub peek_mode: PeekMode,

    #[serde(default = "default_resource_groups")]
    pub resource_groups: Vec<ResourceGroupConfig>,
}

fn default_version() -> String {
    concat!("shellcache-v", env!("CARGO_PKG_VERSION")).into()
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_app_shell_url() -> String {
    "./index.html".into()
}

fn default_offline_url() -> String {
    "./offline.html".into()
}

fn default_true() -> bool {
    true
}

fn default_manifest() -> PrecacheManifest {
    PrecacheManifest {
        critical: vec![
            "./index.html".into(),
            "./manifest.json".into(),
            "./offline.html".into(),
            "./assets/icon.svg".into(),
        ],
        optional: Vec::new(),
    }
}

fn default_resource_groups() -> Vec<ResourceGroupConfig> {
    vec![
        ResourceGroupConfig {
            label: "React Core".into(),
            urls: vec![
                "https://esm.sh/react@18.3.1".into(),
                "https://esm.sh/react-dom@18.3.1/client".into(),
                "https://esm.sh/react@18.3.1/".into(),
                "https://esm.sh/react-dom@18.3.1/".into(),
            ],
        },
        ResourceGroupConfig { label: "Tailwind".into(), urls: vec!["https://cdn.tailwindcss.com/3.4.1".into()] },
        ResourceGroupConfig {
            label: "Arabic Fonts".into(),
            urls: vec![
                "https://fonts.googleapis.com/css2?family=Tajawal:wght@400;500;700&family=Cairo:wght@400;700&family=Almarai:wght@400;700&display=swap".into(),
            ],
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            quota_bytes: None,
            app_shell_url: default_app_shell_url(),
            offline_url: default_offline_url(),
            skip_waiting: true,
            manifest: default_manifest(),
            routes: RouteTable::default(),
            peek_mode: PeekMode::default(),
            resource_groups: default_resource_groups(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => {
                Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") })
            }
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Look up a configured resource group by label.
    pub fn resource_group(&self, label: &str) -> Option<&ResourceGroupConfig> {
        self.resource_groups.iter().find(|g| g.label == label)
    }
}
