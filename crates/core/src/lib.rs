//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Response model and classification
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod response;

pub use cache::{CacheDb, CacheEntry, Namespace};
pub use config::{AppConfig, PeekMode, PrecacheManifest, ResourceGroupConfig, RouteTable, Strategy};
pub use error::Error;
pub use response::{Response, ResponseKind};
