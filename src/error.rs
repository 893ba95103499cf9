//! Error types for the offline-cache library.

use thiserror::Error;

/// Errors that can occur while installing or resolving cached assets.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure talking to the network.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An asset fetched during install answered with a non-success status.
    #[error("Asset {url} answered with status {status}")]
    Status {
        /// URL of the asset that failed.
        url: String,
        /// HTTP status code returned.
        status: u16,
    },

    /// A URL could not be parsed or joined onto the origin.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL or path.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The asset manifest is malformed.
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// A cache store name is unusable.
    #[error("Invalid cache name: {0:?}")]
    InvalidCacheName(String),

    /// I/O error in the disk-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or written.
    #[error("Config error: {0}")]
    Config(String),

    /// A stored entry's metadata could not be decoded.
    #[error("Corrupt cache entry: {0}")]
    Entry(#[from] serde_json::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// A specialized `Result` type for offline-cache operations.
pub type Result<T> = std::result::Result<T, Error>;
