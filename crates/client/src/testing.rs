//! Scripted [`Fetcher`] for tests.
//!
//! Routes are keyed by absolute URL. Unknown URLs fail with a network error,
//! as does every URL while the fetcher is switched offline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use shellcache_core::Response;
use tokio::sync::Semaphore;

use crate::fetch::{FetchError, Fetcher, Request, RequestMode};

#[derive(Debug, Clone)]
enum Script {
    Respond(Response),
    Fail(FetchError),
    /// `cors` is rejected; `no-cors` yields an opaque body.
    CorsRejected(Bytes),
}

/// A [`Fetcher`] that replays canned outcomes and records every call.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Script>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<(String, RequestMode)>>,
    offline: AtomicBool,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response` in every mode.
    pub fn with_response(self, url: &str, response: Response) -> Self {
        self.set_response(url, response);
        self
    }

    /// Fail `url` with `error` in every mode.
    pub fn with_failure(self, url: &str, error: FetchError) -> Self {
        self.lock_routes().insert(url.to_string(), Script::Fail(error));
        self
    }

    /// Reject `url` in cors mode; answer it opaquely in no-cors mode.
    pub fn with_cors_rejection(self, url: &str, body: &'static str) -> Self {
        self.lock_routes()
            .insert(url.to_string(), Script::CorsRejected(Bytes::from_static(body.as_bytes())));
        self
    }

    /// Replace the scripted response for `url`.
    pub fn set_response(&self, url: &str, response: Response) {
        self.lock_routes().insert(url.to_string(), Script::Respond(response));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Hold every fetch of `url` until [`release`](Self::release) is called.
    pub fn gate(&self, url: &str) {
        self.gates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let `permits` held fetches of `url` proceed.
    pub fn release(&self, url: &str, permits: usize) {
        if let Some(gate) = self.gates.lock().unwrap_or_else(|e| e.into_inner()).get(url) {
            gate.add_permits(permits);
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(String, RequestMode)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|(u, _)| u == url).count()
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, Script>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url.as_str().to_string();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((url.clone(), request.mode));

        let gate = self.gates.lock().unwrap_or_else(|e| e.into_inner()).get(&url).cloned();
        if let Some(gate) = gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network(format!("offline: {url}")));
        }

        let script = self.lock_routes().get(&url).cloned();
        match script {
            Some(Script::Respond(response)) => Ok(response),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::CorsRejected(body)) => match request.mode {
                RequestMode::NoCors => Ok(Response::opaque(body)),
                _ => Err(FetchError::Cors(url)),
            },
            None => Err(FetchError::Network(format!("no route: {url}"))),
        }
    }
}
