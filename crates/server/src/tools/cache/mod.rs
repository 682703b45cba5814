//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and clearing the versioned store.

pub mod clear;
pub mod namespaces;

pub use clear::{CacheClearParams, clear_impl};
pub use namespaces::{CacheNamespacesParams, namespaces_impl};
