//! SQLite-backed versioned cache store.
//!
//! This module provides a persistent key→response store using SQLite with
//! async access via tokio-rusqlite. It supports:
//!
//! - Named namespaces, one per deployed version
//! - Entries keyed by request URL, with digest verification on read
//! - Transactional batch writes and per-namespace quotas
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod namespaces;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use namespaces::Namespace;
