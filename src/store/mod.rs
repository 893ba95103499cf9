//! Named cache stores.
//!
//! A [`CacheStorage`] opens stores by name, creating them if absent. Each
//! [`Cache`] maps normalized [`CacheKey`]s to buffered responses. Stores are
//! isolated from one another, so bumping the version embedded in a name never
//! disturbs the previous store.

mod disk;
mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::fetch::AssetResponse;
use crate::key::CacheKey;

pub use disk::{DiskCache, DiskStorage, EntryMeta};
pub use memory::{MemoryCache, MemoryStorage};

/// A single named key → response store.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Inserts `response` under `key`, replacing any existing entry.
    async fn put(&self, key: &CacheKey, response: &AssetResponse) -> Result<()>;

    /// Inserts every entry in order, stopping at the first failure.
    async fn put_all(&self, entries: &[(CacheKey, AssetResponse)]) -> Result<()> {
        for (key, response) in entries {
            self.put(key, response).await?;
        }
        Ok(())
    }

    /// Returns the stored response for `key`, if any.
    async fn lookup(&self, key: &CacheKey) -> Result<Option<AssetResponse>>;

    /// Returns every stored key in sorted order.
    async fn keys(&self) -> Result<Vec<CacheKey>>;
}

/// Registry of named stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Store handle returned by [`open`](Self::open).
    type Cache: Cache;

    /// Opens the store called `name`, creating it if absent.
    async fn open(&self, name: &str) -> Result<Self::Cache>;

    /// Returns true if a store called `name` has been created.
    async fn has(&self, name: &str) -> Result<bool>;
}

/// Rejects names that cannot double as a single directory component.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(Error::InvalidCacheName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_names_are_valid() {
        assert!(validate_name("blocks-v1").is_ok());
        assert!(validate_name("blocks.v2_beta").is_ok());
    }

    #[test]
    fn path_like_names_are_rejected() {
        for name in ["", ".", "..", "a/b", "a\\b", "tab\tname"] {
            assert!(
                matches!(validate_name(name), Err(Error::InvalidCacheName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
