//! Directory-backed cache storage.
//!
//! Layout: `<root>/<store name>/<sha256(key)>.json` holds the entry metadata
//! and `<sha256(key)>.body` the raw body. Both files are written to a
//! uniquely named `.tmp` sibling and renamed into place, body first. Writers
//! racing on one key may interleave their renames, so lookup checks the body
//! length against the metadata and treats a mismatch as a miss.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::fetch::AssetResponse;
use crate::key::CacheKey;

use super::{Cache, CacheStorage, validate_name};

/// Metadata persisted next to each body file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Normalized key the entry is stored under.
    pub key: CacheKey,
    /// URL the response was fetched from.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers in wire order.
    pub headers: Vec<(String, String)>,
    /// Length of the body file in bytes.
    pub body_len: u64,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

/// Cache storage rooted at a directory, one subdirectory per store.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Creates a storage rooted at `root`. Nothing is created until a store is opened.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    type Cache = DiskCache;

    async fn open(&self, name: &str) -> Result<DiskCache> {
        validate_name(name)?;
        let dir = self.root.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(DiskCache { dir })
    }

    async fn has(&self, name: &str) -> Result<bool> {
        if validate_name(name).is_err() {
            return Ok(false);
        }
        match tokio::fs::metadata(self.root.join(name)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Handle to one on-disk store.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(key: &CacheKey) -> String {
        format!("{:x}", Sha256::digest(key.as_str().as_bytes()))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", Self::stem(key)))
    }

    fn body_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.body", Self::stem(key)))
    }

    async fn read_meta(path: &Path) -> Result<Option<EntryMeta>> {
        match tokio::fs::read(path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the stored metadata for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata file exists but cannot be read or decoded.
    pub async fn metadata(&self, key: &CacheKey) -> Result<Option<EntryMeta>> {
        Self::read_meta(&self.meta_path(key)).await
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// Temp names are unique per process and per write.
fn tmp_path(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.{n}.tmp", std::process::id()));
    PathBuf::from(tmp)
}

async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl Cache for DiskCache {
    async fn put(&self, key: &CacheKey, response: &AssetResponse) -> Result<()> {
        let meta = EntryMeta {
            key: key.clone(),
            url: response.url.clone(),
            status: response.status,
            headers: response.headers.clone(),
            body_len: response.body.len() as u64,
            stored_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        write_atomic(&self.body_path(key), &response.body).await?;
        write_atomic(&self.meta_path(key), &meta_json).await?;
        log::debug!("Stored {key} in {}", self.dir.display());
        Ok(())
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<AssetResponse>> {
        let Some(meta) = self.metadata(key).await? else {
            return Ok(None);
        };
        let body = match tokio::fs::read(self.body_path(key)).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if body.len() as u64 != meta.body_len {
            log::debug!(
                "Body for {key} is {} bytes, metadata says {}; treating as miss",
                body.len(),
                meta.body_len
            );
            return Ok(None);
        }
        Ok(Some(AssetResponse {
            url: meta.url,
            status: meta.status,
            headers: meta.headers,
            body: body.into(),
        }))
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(meta) = Self::read_meta(&path).await?
            {
                keys.push(meta.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
