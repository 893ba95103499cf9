//! Normalized cache keys.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Request identity used for cache lookups: origin plus path.
///
/// Query string, fragment and credentials are dropped, so two requests that
/// differ only in query parameters collapse onto the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for an already parsed URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut clean = url.clone();
        clean.set_query(None);
        clean.set_fragment(None);
        if !clean.username().is_empty() || clean.password().is_some() {
            // A URL carrying credentials has a host, so clearing them succeeds.
            let cleared = clean.set_username("").and_then(|()| clean.set_password(None));
            debug_assert!(cleared.is_ok());
        }
        Self(clean.into())
    }

    /// Parses `url` and builds its key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` is not an absolute URL.
    pub fn parse(url: &str) -> Result<Self> {
        Url::parse(url)
            .map(|u| Self::from_url(&u))
            .map_err(|e| Error::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_string() {
        let key = CacheKey::parse("https://example.com/app.js?cachebust=123").unwrap();
        assert_eq!(key.as_str(), "https://example.com/app.js");
    }

    #[test]
    fn strips_fragment_and_credentials() {
        let key = CacheKey::parse("https://user:pw@example.com/index.html?a=1#top").unwrap();
        assert_eq!(key.as_str(), "https://example.com/index.html");
    }

    #[test]
    fn strips_password_without_username() {
        let key = CacheKey::parse("https://:pw@example.com/app.js").unwrap();
        assert_eq!(key.as_str(), "https://example.com/app.js");
    }

    #[test]
    fn hostless_urls_keep_their_path() {
        let key = CacheKey::parse("file:///srv/blocks/app.js?v=1").unwrap();
        assert_eq!(key.as_str(), "file:///srv/blocks/app.js");
    }

    #[test]
    fn keeps_port_and_path() {
        let key = CacheKey::parse("http://127.0.0.1:8080/logo-32.png").unwrap();
        assert_eq!(key.as_str(), "http://127.0.0.1:8080/logo-32.png");
    }

    #[test]
    fn root_and_bare_origin_match() {
        let a = CacheKey::parse("https://example.com").unwrap();
        let b = CacheKey::parse("https://example.com/?utm_source=x").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_paths_differ() {
        let a = CacheKey::parse("https://example.com/a").unwrap();
        let b = CacheKey::parse("https://example.com/b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn relative_url_is_rejected() {
        let err = CacheKey::parse("/app.js").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn query_variants_collapse(
                path in "(/[a-z0-9_.-]{1,12}){0,4}",
                q1 in "[a-z0-9=&]{0,20}",
                q2 in "[a-z0-9=&]{0,20}",
            ) {
                let a = CacheKey::parse(&format!("https://example.com{path}?{q1}")).unwrap();
                let b = CacheKey::parse(&format!("https://example.com{path}?{q2}")).unwrap();
                prop_assert_eq!(a, b);
            }

            #[test]
            fn normalization_is_idempotent(
                path in "(/[a-z0-9_.-]{1,12}){0,4}",
                q in "[a-z0-9=&]{0,20}",
            ) {
                let once = CacheKey::parse(&format!("https://example.com{path}?{q}")).unwrap();
                let twice = CacheKey::parse(once.as_str()).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
