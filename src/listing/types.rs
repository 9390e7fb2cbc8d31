//! Listing types and traits
//!
//! Defines the page-level contract every listable store implements.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Fully-qualified address of one object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectLocator {
    /// URL scheme of the store
    pub scheme: String,
    /// Bucket holding the object
    pub bucket: String,
    /// Full key within the bucket
    pub key: String,
}

impl ObjectLocator {
    /// Create a locator
    pub fn new(
        scheme: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}/{}",
            self.scheme,
            self.bucket.trim_start_matches('/'),
            self.key
        )
    }
}

/// One page of a listing response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys in this page, in store order
    pub keys: Vec<String>,
    /// Token for the next page; `None` when the listing is complete
    pub next_token: Option<String>,
}

impl ListPage {
    /// Create a final page
    pub fn last(keys: Vec<String>) -> Self {
        Self {
            keys,
            next_token: None,
        }
    }

    /// Create a page followed by more pages
    pub fn with_next(keys: Vec<String>, token: impl Into<String>) -> Self {
        Self {
            keys,
            next_token: Some(token.into()),
        }
    }
}

/// A store that lists keys in pages
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of at most `max_keys` keys under `prefix`,
    /// continuing after `continuation` when given
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage>;

    /// Build the locator for a key returned by `list_page`
    fn locate(&self, key: &str) -> ObjectLocator;
}
