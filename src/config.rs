//! Configuration for the offline cache.

use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manifest::AssetManifest;

/// Store name used by the `blocks` application. The version suffix isolates
/// each release's store from the previous one.
pub const DEFAULT_CACHE_NAME: &str = "blocks-v1";

/// Origin the manifest paths are resolved against by default.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8080/";

/// Immutable configuration of one cache version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the store the manifest is installed into.
    pub cache_name: String,
    /// Origin every manifest path is resolved against.
    pub origin: Url,
    /// Assets fetched at install time.
    pub assets: AssetManifest,
    /// Maximum number of asset fetches in flight during install.
    pub concurrent_fetches: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid URL"),
            assets: AssetManifest::default(),
            concurrent_fetches: 4,
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store name.
    #[must_use]
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the asset manifest.
    #[must_use]
    pub fn with_assets(mut self, assets: AssetManifest) -> Self {
        self.assets = assets;
        self
    }

    /// Sets the install fetch concurrency. Zero is treated as one.
    #[must_use]
    pub fn with_concurrent_fetches(mut self, concurrent: usize) -> Self {
        self.concurrent_fetches = concurrent;
        self
    }

    /// Parses a TOML document. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is not valid TOML or a
    /// value is malformed (including an invalid manifest).
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Serializes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Loads configuration from `path`, or defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&source)
    }
}

/// Where on-disk stores live.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Root directory holding one subdirectory per store.
    pub store_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            store_dir: Self::default_store_dir(),
        }
    }
}

impl PathConfig {
    /// Returns the store root.
    ///
    /// Uses `OFFLINE_CACHE_DIR` when set, falling back to
    /// `$XDG_DATA_HOME/offline-cache/stores`.
    #[must_use]
    pub fn default_store_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("OFFLINE_CACHE_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("offline-cache")
                .join("stores")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_name, "blocks-v1");
        assert_eq!(config.origin.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.assets.len(), 13);
        assert_eq!(config.concurrent_fetches, 4);
    }

    #[test]
    fn builder_pattern() {
        let config = CacheConfig::new()
            .with_cache_name("blocks-v2")
            .with_origin(Url::parse("https://example.com/").unwrap())
            .with_assets(AssetManifest::new(["/", "/app.js"]).unwrap())
            .with_concurrent_fetches(1);

        assert_eq!(config.cache_name, "blocks-v2");
        assert_eq!(config.origin.host_str(), Some("example.com"));
        assert_eq!(config.assets.paths(), ["/", "/app.js"]);
        assert_eq!(config.concurrent_fetches, 1);
    }

    #[test]
    fn toml_round_trip() {
        let config = CacheConfig::default().with_cache_name("blocks-v9");
        let text = config.to_toml().unwrap();
        assert_eq!(CacheConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = CacheConfig::from_toml(
            r#"
            cache_name = "shop-v3"
            assets = ["/", "/shop.js"]
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_name, "shop-v3");
        assert_eq!(config.assets.len(), 2);
        assert_eq!(config.origin.as_str(), DEFAULT_ORIGIN);
    }

    #[test]
    fn toml_with_bad_manifest_is_rejected() {
        let err = CacheConfig::from_toml(r#"assets = ["relative.js"]"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn load_without_path_is_default() {
        assert_eq!(CacheConfig::load(None).await.unwrap(), CacheConfig::default());
    }

    #[tokio::test]
    async fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("offline-cache.toml");
        std::fs::write(&path, "origin = \"https://example.com/\"\n").unwrap();
        let config = CacheConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.origin.as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn load_missing_file_fails() {
        let err = CacheConfig::load(Some(Path::new("/nonexistent/offline-cache.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
