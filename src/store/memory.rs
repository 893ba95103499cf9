//! In-process cache storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::Result;
use crate::fetch::AssetResponse;
use crate::key::CacheKey;

use super::{Cache, CacheStorage, validate_name};

type Entries = Arc<RwLock<BTreeMap<CacheKey, AssetResponse>>>;

/// Cache storage that lives for as long as the value does.
///
/// Clones share the same stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stores: Arc<RwLock<HashMap<String, Entries>>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of every created store.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    type Cache = MemoryCache;

    async fn open(&self, name: &str) -> Result<MemoryCache> {
        validate_name(name)?;
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        let entries = stores.entry(name.to_string()).or_default();
        Ok(MemoryCache {
            entries: Arc::clone(entries),
        })
    }

    async fn has(&self, name: &str) -> Result<bool> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        Ok(stores.contains_key(name))
    }
}

/// Handle to one in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Entries,
}

impl MemoryCache {
    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn put(&self, key: &CacheKey, response: &AssetResponse) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), response.clone());
        Ok(())
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<AssetResponse>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}
