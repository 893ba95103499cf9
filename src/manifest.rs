//! The fixed list of assets pre-fetched at install time.

use std::collections::HashSet;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Assets shipped with the `blocks` web application.
pub const DEFAULT_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/wasm_exec.js",
    "/blocks.wasm",
    "/logo.png",
    "/logo-16.png",
    "/logo-32.png",
    "/logo-152.png",
    "/logo-167.png",
    "/logo-180.png",
    "/logo-192.png",
    "/logo-512.png",
    "/manifest.json",
];

/// Ordered, immutable list of absolute asset paths.
///
/// Paths are validated once at construction: each must start with `/` and
/// appear only once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AssetManifest {
    paths: Vec<String>,
}

impl AssetManifest {
    /// Builds a manifest from a list of paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`] for empty, relative or duplicate paths.
    pub fn new<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for path in &paths {
            if path.is_empty() {
                return Err(Error::Manifest("empty asset path".to_string()));
            }
            if !path.starts_with('/') {
                return Err(Error::Manifest(format!("asset path must be absolute: {path}")));
            }
            if !seen.insert(path.as_str()) {
                return Err(Error::Manifest(format!("duplicate asset path: {path}")));
            }
        }
        Ok(Self { paths })
    }

    /// Returns the paths in manifest order.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Returns the number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns true if the manifest lists no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolves every path against `origin`, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if a path cannot be joined onto `origin`.
    pub fn urls(&self, origin: &Url) -> Result<Vec<Url>> {
        self.paths
            .iter()
            .map(|path| {
                origin.join(path).map_err(|e| Error::InvalidUrl {
                    url: path.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            paths: DEFAULT_ASSETS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for AssetManifest {
    type Error = Error;

    fn try_from(paths: Vec<String>) -> Result<Self> {
        Self::new(paths)
    }
}

impl From<AssetManifest> for Vec<String> {
    fn from(manifest: AssetManifest) -> Self {
        manifest.paths
    }
}
