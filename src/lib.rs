//! offline-cache - pre-fetch a web application's static assets and serve them offline.
//!
//! At install time every path in an [`AssetManifest`] is fetched from the
//! configured origin and written into a named store. Afterwards each request
//! is answered from that store when its query-stripped [`CacheKey`] is present,
//! and from the network otherwise.
//!
//! # Example
//!
//! ```no_run
//! use offline_cache::{
//!     AssetRequest, CacheConfig, MemoryStorage, NoProgress, OfflineCache, ReqwestFetcher,
//! };
//!
//! # async fn example() -> offline_cache::Result<()> {
//! let cache = OfflineCache::new(
//!     CacheConfig::default(),
//!     MemoryStorage::new(),
//!     ReqwestFetcher::new()?,
//! );
//!
//! // Populate the store; fails as a whole if any asset cannot be fetched.
//! let stats = cache.install(&NoProgress).await?;
//! println!("Stored {} assets", stats.assets_stored);
//!
//! // Served from the store: the query string is ignored for the lookup.
//! let request = AssetRequest::parse("http://127.0.0.1:8080/blocks.wasm?v=42")?;
//! let resolved = cache.resolve(&request).await?;
//! println!("{} {}", resolved.source.as_str(), resolved.response.status);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod key;
pub mod manifest;
#[cfg(feature = "proxy")]
pub mod proxy;
pub mod stats;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use cache::{InstallProgress, NoProgress, OfflineCache, Resolved, Source};
pub use config::{CacheConfig, PathConfig};
pub use error::{Error, Result};
pub use fetch::{AssetRequest, AssetResponse, Fetcher, ReqwestFetcher};
pub use format::{format_bytes, format_duration};
pub use key::CacheKey;
pub use manifest::AssetManifest;
pub use stats::InstallStats;
pub use store::{Cache, CacheStorage, DiskCache, DiskStorage, MemoryCache, MemoryStorage};
