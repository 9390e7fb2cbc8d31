//! Lazy paginated lister

use super::types::{ListingSource, ObjectLocator};
use crate::config::MAX_PAGE_SIZE;
use crate::error::{Error, Result};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

/// Check whether the file name of a key ends with `suffix`
///
/// A file name that is nothing but the suffix (e.g. `.json`) does not match.
pub fn has_suffix(key: &str, suffix: &str) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name.len() > suffix.len() && file_name.ends_with(suffix)
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Enumerates the objects with a required suffix under a prefix
///
/// Every call to [`ObjectLister::locators`] starts a fresh listing.
pub struct ObjectLister<'a> {
    source: &'a dyn ListingSource,
    prefix: String,
    suffix: String,
    page_size: usize,
}

impl<'a> ObjectLister<'a> {
    /// Create a lister for `.json` objects with the store's max page size
    pub fn new(source: &'a dyn ListingSource, prefix: impl Into<String>) -> Self {
        Self {
            source,
            prefix: prefix.into(),
            suffix: ".json".to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Set the required key suffix
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the page size (clamped to 1..=MAX_PAGE_SIZE)
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Get the prefix being listed
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Stream matching locators, fetching pages only as the stream is polled
    ///
    /// A failed page ends the stream with that error.
    pub fn locators(&self) -> BoxStream<'a, Result<ObjectLocator>> {
        let source = self.source;
        let prefix = self.prefix.clone();
        let suffix = self.suffix.clone();
        let page_size = self.page_size;

        stream::try_unfold(Cursor::Start, move |cursor| {
            let prefix = prefix.clone();
            let suffix = suffix.clone();
            async move {
                let token = match cursor {
                    Cursor::Done => return Ok(None),
                    Cursor::Start => None,
                    Cursor::Next(token) => Some(token),
                };

                let page = source
                    .list_page(&prefix, token.as_deref(), page_size)
                    .await?;

                let matched: Vec<ObjectLocator> = page
                    .keys
                    .iter()
                    .filter(|key| has_suffix(key, &suffix))
                    .map(|key| source.locate(key))
                    .collect();

                debug!(
                    "Listed page under '{}': {} keys, {} matching '{}'",
                    prefix,
                    page.keys.len(),
                    matched.len(),
                    suffix
                );

                let next = match page.next_token {
                    Some(next) if token.as_deref() == Some(next.as_str()) => {
                        return Err(Error::retrieval(
                            prefix,
                            format!("continuation token '{next}' did not advance"),
                        ));
                    }
                    Some(next) => Cursor::Next(next),
                    None => Cursor::Done,
                };

                Ok(Some((matched, next)))
            }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
        .boxed()
    }

    /// Drain the listing into a vector
    pub async fn collect(&self) -> Result<Vec<ObjectLocator>> {
        self.locators().try_collect().await
    }
}
