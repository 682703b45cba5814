//! Version lifecycle: install, wait, activate, claim.
//!
//! A new version is installed into its own namespace by the precache loader.
//! It then waits until no client is controlled by the previous version, or
//! until `skip_waiting` forces it through. Activation retires every other
//! namespace and claims all connected clients, so pages loaded before the
//! version existed are routed through it without a reload.
//!
//! A failed install only discards the new namespace; the active version keeps
//! serving.

pub mod gc;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, Error, Namespace, PrecacheManifest};
use tokio::sync::RwLock;

pub use gc::collect_garbage;

use crate::precache::{InstallReport, PrecacheLoader};

/// Opaque identifier for a connected page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u64);

/// Result of activating a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    pub version: String,
    /// Namespaces deleted by garbage collection.
    pub retired: Vec<String>,
    /// Number of connected clients now controlled by `version`.
    pub claimed: usize,
}

/// Snapshot of the lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStatus {
    pub active: Option<String>,
    pub waiting: Option<String>,
    pub clients: usize,
    pub controlled_clients: usize,
}

#[derive(Debug, Default)]
struct State {
    active: Option<String>,
    waiting: Option<String>,
    /// Client → controlling version. `None` means uncontrolled.
    clients: HashMap<ClientId, Option<String>>,
    next_client: u64,
}

impl State {
    fn controlled(&self) -> usize {
        self.clients.values().filter(|c| c.is_some()).count()
    }
}

/// Tracks the active and waiting versions and the clients they control.
pub struct Registration {
    db: CacheDb,
    loader: PrecacheLoader,
    skip_waiting: bool,
    state: RwLock<State>,
}

impl Registration {
    /// `skip_waiting` activates every successful install immediately.
    pub fn new(db: CacheDb, loader: PrecacheLoader, skip_waiting: bool) -> Self {
        Self { db, loader, skip_waiting, state: RwLock::new(State::default()) }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Install `version` from `manifest`.
    ///
    /// Returns `Ok(None)` when `version` is already active and fully
    /// installed. On success the version is waiting, and is activated right
    /// away if nothing holds it back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallAborted`] when a critical asset fails. A
    /// namespace that was not already installed is removed and the active
    /// version is untouched.
    pub async fn install(&self, version: &str, manifest: &PrecacheManifest) -> Result<Option<InstallReport>, Error> {
        let installed_before = self.db.is_installed(version).await?;
        let is_active = self.state.read().await.active.as_deref() == Some(version);
        if is_active && installed_before {
            tracing::info!(version, "version already active; skipping install");
            return Ok(None);
        }

        let namespace = self.db.open_namespace(version).await?;

        let report = match self.loader.install(&namespace, manifest).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(version, error = %e, "install failed; keeping previous version");
                if !installed_before && let Err(cleanup) = self.db.delete_namespace(version).await {
                    tracing::warn!(version, error = %cleanup, "failed to discard namespace of failed install");
                }
                return Err(e);
            }
        };

        let ready = {
            let mut state = self.state.write().await;
            state.waiting = Some(version.to_string());
            self.skip_waiting || state.controlled() == 0 || state.active.as_deref() == Some(version)
        };
        tracing::info!(version, "version installed and waiting");

        if ready {
            self.activate().await?;
        }

        Ok(Some(report))
    }

    /// Adopt the most recently installed namespace as the active version.
    ///
    /// Lets a restarted process keep serving offline before any install runs.
    /// Namespaces left behind by an interrupted install are ignored. No-op
    /// once a version is active.
    pub async fn resume(&self) -> Result<Option<String>, Error> {
        if self.state.read().await.active.is_some() {
            return Ok(None);
        }
        let Some(version) = self.db.latest_installed().await? else {
            return Ok(None);
        };

        let mut state = self.state.write().await;
        if state.active.is_some() {
            return Ok(None);
        }
        state.active = Some(version.clone());
        for controller in state.clients.values_mut() {
            *controller = Some(version.clone());
        }
        tracing::info!(version = %version, "resumed version from store");

        Ok(Some(version))
    }

    /// Drop every entry of namespace `name`.
    ///
    /// When `name` is the active version its namespace is recreated empty and
    /// marked incomplete, so the active version keeps intercepting (serving
    /// the offline fallback) and the next install of it refills it.
    pub async fn clear_namespace(&self, name: &str) -> Result<bool, Error> {
        let deleted = self.db.delete_namespace(name).await?;
        if self.active().await.as_deref() == Some(name) {
            self.db.open_namespace(name).await?;
            tracing::info!(version = name, "cleared active namespace; reinstall required");
        }
        Ok(deleted)
    }

    /// Control channel: force the waiting version to take over now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoWaitingVersion`] if nothing is waiting.
    pub async fn skip_waiting(&self) -> Result<Activation, Error> {
        self.activate().await?.ok_or(Error::NoWaitingVersion)
    }

    async fn activate(&self) -> Result<Option<Activation>, Error> {
        let (version, claimed) = {
            let mut state = self.state.write().await;
            let Some(version) = state.waiting.take() else {
                return Ok(None);
            };
            state.active = Some(version.clone());
            for controller in state.clients.values_mut() {
                *controller = Some(version.clone());
            }
            (version, state.clients.len())
        };

        let retired = collect_garbage(&self.db, &version).await?;
        tracing::info!(version = %version, claimed, retired = retired.len(), "version activated");

        Ok(Some(Activation { version, retired, claimed }))
    }

    /// Register a newly loaded page. It is controlled by the active version, if any.
    pub async fn connect_client(&self) -> ClientId {
        let mut state = self.state.write().await;
        let id = ClientId(state.next_client);
        state.next_client += 1;
        let controller = state.active.clone();
        state.clients.insert(id, controller);
        id
    }

    /// Forget a page. When the last controlled page goes away a waiting version activates.
    pub async fn disconnect_client(&self, id: ClientId) -> Result<Option<Activation>, Error> {
        let ready = {
            let mut state = self.state.write().await;
            state.clients.remove(&id);
            state.waiting.is_some() && state.controlled() == 0
        };

        if ready { self.activate().await } else { Ok(None) }
    }

    /// Version controlling `id`. `None` for unknown or uncontrolled clients.
    pub async fn controller(&self, id: ClientId) -> Option<String> {
        self.state.read().await.clients.get(&id).cloned().flatten()
    }

    pub async fn active(&self) -> Option<String> {
        self.state.read().await.active.clone()
    }

    pub async fn waiting(&self) -> Option<String> {
        self.state.read().await.waiting.clone()
    }

    /// Handle to the active version's namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotActive`] if no version is active or its namespace is gone.
    pub async fn active_namespace(&self) -> Result<Namespace, Error> {
        let version = self.active().await.ok_or(Error::NotActive)?;
        self.db.existing_namespace(&version).await?.ok_or(Error::NotActive)
    }

    pub async fn status(&self) -> LifecycleStatus {
        let state = self.state.read().await;
        LifecycleStatus {
            active: state.active.clone(),
            waiting: state.waiting.clone(),
            clients: state.clients.len(),
            controlled_clients: state.controlled(),
        }
    }
}
