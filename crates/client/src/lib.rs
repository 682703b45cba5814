//! Client side of shellcache.
//!
//! This crate provides the network fetch layer, the precache loader, version
//! lifecycle and garbage collection, the fetch strategy router, and the bulk
//! downloader. The server crate wires them together.

pub mod bulk;
pub mod fetch;
pub mod interceptor;
pub mod lifecycle;
pub mod precache;
pub mod router;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use bulk::{BulkDownloader, GroupState, GroupStatus, ResourceGroup};
pub use fetch::{FetchConfig, FetchError, Fetcher, HttpFetcher, Request, RequestMode};
pub use interceptor::Interceptor;
pub use lifecycle::{Activation, ClientId, LifecycleStatus, Registration};
pub use precache::{InstallReport, PrecacheLoader};
pub use router::Router;
pub use reqwest::Method;
