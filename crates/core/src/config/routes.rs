//! Strategy table configuration.
//!
//! Requests are classified on two axes (navigation or subresource, same- or
//! cross-origin) and each of the four cells names the strategy that serves it.

use serde::{Deserialize, Serialize};

/// Caching strategy applied to a class of requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Exact hit, then app shell, then network, then offline document.
    AppShell,
    /// Serve a hit immediately and refresh it in the background.
    StaleWhileRevalidate,
    /// Serve a hit without touching the network; fetch and store on a miss.
    CacheFirst,
    /// Network first, store on success, cache on failure.
    NetworkFirst,
    /// Never read or write the store.
    NetworkOnly,
}

/// Per-class strategy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default = "default_navigation")]
    pub navigation_same_origin: Strategy,

    #[serde(default = "default_navigation")]
    pub navigation_cross_origin: Strategy,

    #[serde(default = "default_subresource")]
    pub subresource_same_origin: Strategy,

    #[serde(default = "default_subresource")]
    pub subresource_cross_origin: Strategy,
}

fn default_navigation() -> Strategy {
    Strategy::AppShell
}

fn default_subresource() -> Strategy {
    Strategy::StaleWhileRevalidate
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            navigation_same_origin: default_navigation(),
            navigation_cross_origin: default_navigation(),
            subresource_same_origin: default_subresource(),
            subresource_cross_origin: default_subresource(),
        }
    }
}

impl RouteTable {
    /// Look up the strategy for a request class.
    pub fn lookup(&self, navigation: bool, same_origin: bool) -> Strategy {
        match (navigation, same_origin) {
            (true, true) => self.navigation_same_origin,
            (true, false) => self.navigation_cross_origin,
            (false, true) => self.subresource_same_origin,
            (false, false) => self.subresource_cross_origin,
        }
    }
}
