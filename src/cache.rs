//! The offline asset cache: install-time population and request resolution.

use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};
use reqwest::Url;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::fetch::{AssetRequest, AssetResponse, Fetcher, ReqwestFetcher};
use crate::key::CacheKey;
use crate::stats::InstallStats;
use crate::store::{Cache, CacheStorage, MemoryStorage};

/// Trait for receiving install progress updates.
///
/// All methods have default no-op implementations.
pub trait InstallProgress: Send + Sync {
    /// Called when the fetch of an asset starts.
    fn on_asset_start(&self, _url: &str) {}

    /// Called when an asset was fetched with a success status.
    fn on_asset_fetched(&self, _url: &str, _bytes: u64) {}

    /// Called when an asset fetch fails, just before install fails.
    fn on_error(&self, _url: &str, _error: &str) {}

    /// Called once every asset has been stored.
    fn on_complete(&self, _stats: &InstallStats) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl InstallProgress for NoProgress {}

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Served from the store without touching the network.
    Cache,
    /// Fetched live after a cache miss.
    Network,
}

impl Source {
    /// Returns a short lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "hit",
            Self::Network => "miss",
        }
    }
}

/// A response together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Cache hit or network fallback.
    pub source: Source,
    /// The response delivered to the requester.
    pub response: AssetResponse,
}

/// Pre-caches a fixed manifest and answers requests from it.
pub struct OfflineCache<S: CacheStorage = MemoryStorage, F: Fetcher = ReqwestFetcher> {
    config: CacheConfig,
    storage: S,
    fetcher: F,
}

impl<S: CacheStorage, F: Fetcher> OfflineCache<S, F> {
    /// Creates a cache over `storage`, fetching through `fetcher`.
    #[must_use]
    pub const fn new(config: CacheConfig, storage: S, fetcher: F) -> Self {
        Self {
            config,
            storage,
            fetcher,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the network fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Populates the configured store with every manifest asset.
    ///
    /// All assets are fetched before anything is written; the store is only
    /// touched once every fetch returned a 2xx response. Existing entries are
    /// overwritten, so installing again with the same name succeeds.
    ///
    /// # Errors
    ///
    /// Fails as a whole on the first transport failure ([`Error::Http`] or
    /// whatever the fetcher reports) or non-2xx status ([`Error::Status`]),
    /// and on any store error.
    pub async fn install(&self, progress: &dyn InstallProgress) -> Result<InstallStats> {
        let start = Instant::now();
        let cache = self.storage.open(&self.config.cache_name).await?;
        let urls = self.config.assets.urls(&self.config.origin)?;

        let entries: Vec<(CacheKey, AssetResponse)> = stream::iter(urls)
            .map(|url| self.fetch_asset(url, progress))
            .buffered(self.config.concurrent_fetches.max(1))
            .try_collect()
            .await?;

        cache.put_all(&entries).await?;

        let stats = InstallStats {
            cache_name: self.config.cache_name.clone(),
            assets_stored: entries.len(),
            total_bytes: entries.iter().map(|(_, r)| r.body.len() as u64).sum(),
            elapsed: start.elapsed(),
        };
        log::info!(
            "Installed {} asset(s) into {}",
            stats.assets_stored,
            stats.cache_name
        );
        progress.on_complete(&stats);
        Ok(stats)
    }

    async fn fetch_asset(
        &self,
        url: Url,
        progress: &dyn InstallProgress,
    ) -> Result<(CacheKey, AssetResponse)> {
        let target = url.to_string();
        progress.on_asset_start(&target);

        let request = AssetRequest::get(url);
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .and_then(|response| {
                if response.is_success() {
                    Ok(response)
                } else {
                    Err(Error::Status {
                        url: target.clone(),
                        status: response.status,
                    })
                }
            })
            .inspect_err(|e| progress.on_error(&target, &e.to_string()))?;

        log::debug!("Fetched {target} ({} bytes)", response.body.len());
        progress.on_asset_fetched(&target, response.body.len() as u64);
        Ok((request.cache_key(), response))
    }

    /// Answers one request.
    ///
    /// The lookup uses the query-stripped key; on a miss the original request
    /// is sent to the network exactly once and its outcome returned as is.
    /// Misses are never written back to the store.
    ///
    /// # Errors
    ///
    /// Propagates store errors and, on a miss, the fetcher's error unchanged.
    pub async fn resolve(&self, request: &AssetRequest) -> Result<Resolved> {
        let key = request.cache_key();

        if self.storage.has(&self.config.cache_name).await? {
            let cache = self.storage.open(&self.config.cache_name).await?;
            if let Some(response) = cache.lookup(&key).await? {
                log::debug!("Cache hit for {key}");
                return Ok(Resolved {
                    source: Source::Cache,
                    response,
                });
            }
        }

        log::debug!("Cache miss for {key}, fetching {}", request.url);
        let response = self.fetcher.fetch(request).await?;
        Ok(Resolved {
            source: Source::Network,
            response,
        })
    }

    /// Returns every key in the configured store, or nothing if it was never created.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn cached_keys(&self) -> Result<Vec<CacheKey>> {
        if !self.storage.has(&self.config.cache_name).await? {
            return Ok(Vec::new());
        }
        self.storage
            .open(&self.config.cache_name)
            .await?
            .keys()
            .await
    }
}
