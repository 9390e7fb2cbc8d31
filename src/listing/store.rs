//! `ListingSource` over an object store bucket
//!
//! The continuation token is the last key of the previous page; the next
//! page lists strictly after it. S3, GCS, Azure and the in-memory store list
//! keys in lexicographic order, so `list_with_offset` serves a page directly.
//! The local filesystem walks directories in no fixed order, so its pages
//! come from a sorted walk over one directory level at a time.

use super::types::{ListPage, ListingSource, ObjectLocator};
use crate::error::{Error, Result};
use crate::storage::{object_path, object_path_opt, ObjectSource};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use object_store::path::Path as ObjectPath;
use object_store::ObjectMeta;

/// One entry of a directory level
enum Entry {
    Object(String),
    Dir(Option<ObjectPath>),
}

impl Entry {
    /// A directory sorts where its keys would, just after its own name
    fn sort_key(&self) -> String {
        match self {
            Self::Object(key) => key.clone(),
            Self::Dir(Some(dir)) => format!("{dir}/"),
            Self::Dir(None) => String::new(),
        }
    }
}

/// Whether every key under `dir` sorts before `after`
fn dir_precedes(dir: Option<&ObjectPath>, after: Option<&str>) -> bool {
    match (dir, after) {
        (Some(dir), Some(after)) => {
            let dir = format!("{dir}/");
            after > dir.as_str() && !after.starts_with(&dir)
        }
        _ => false,
    }
}

impl ObjectSource {
    /// Whether the backend lists keys in lexicographic order
    fn lists_in_key_order(&self) -> bool {
        self.scheme() != "file"
    }

    async fn offset_page(
        &self,
        prefix: Option<&ObjectPath>,
        offset: Option<&ObjectPath>,
        max_keys: usize,
    ) -> object_store::Result<Vec<String>> {
        let listing = match offset {
            Some(offset) => self.store().list_with_offset(prefix, offset),
            None => self.store().list(prefix),
        };

        let metas: Vec<ObjectMeta> = listing.take(max_keys).try_collect().await?;
        Ok(metas.iter().map(|m| m.location.to_string()).collect())
    }

    /// Depth-first walk in key order, skipping directories that end before
    /// `after`
    async fn sorted_page(
        &self,
        prefix: Option<ObjectPath>,
        after: Option<&str>,
        max_keys: usize,
    ) -> object_store::Result<Vec<String>> {
        let mut keys = Vec::with_capacity(max_keys);
        let mut pending = vec![Entry::Dir(prefix)];

        while let Some(entry) = pending.pop() {
            match entry {
                Entry::Object(key) => {
                    if after.map_or(true, |after| key.as_str() > after) {
                        keys.push(key);
                        if keys.len() == max_keys {
                            break;
                        }
                    }
                }
                Entry::Dir(dir) => {
                    if dir_precedes(dir.as_ref(), after) {
                        continue;
                    }

                    let level = self.store().list_with_delimiter(dir.as_ref()).await?;
                    let mut children: Vec<Entry> = level
                        .objects
                        .into_iter()
                        .map(|meta| Entry::Object(meta.location.to_string()))
                        .chain(level.common_prefixes.into_iter().map(|p| Entry::Dir(Some(p))))
                        .collect();
                    children.sort_by_cached_key(Entry::sort_key);
                    pending.extend(children.into_iter().rev());
                }
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl ListingSource for ObjectSource {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ListPage> {
        let full_prefix = self.key(prefix);
        let prefix_path = object_path_opt(&full_prefix)?;

        if continuation.is_some_and(str::is_empty) {
            return Err(Error::retrieval(
                self.url_for(&full_prefix),
                "empty continuation token",
            ));
        }

        let listed = if self.lists_in_key_order() {
            let offset = continuation.map(object_path).transpose()?;
            self.offset_page(prefix_path.as_ref(), offset.as_ref(), max_keys)
                .await
        } else {
            self.sorted_page(prefix_path, continuation, max_keys).await
        };
        let keys =
            listed.map_err(|e| Error::retrieval(self.url_for(&full_prefix), e.to_string()))?;

        if keys.len() < max_keys {
            return Ok(ListPage::last(keys));
        }

        match keys.last().cloned() {
            Some(last) => Ok(ListPage::with_next(keys, last)),
            None => Ok(ListPage::last(keys)),
        }
    }

    fn locate(&self, key: &str) -> ObjectLocator {
        ObjectLocator::new(self.scheme(), self.bucket(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_precedes() {
        let dir = ObjectPath::from("song_data/A/A");
        assert!(dir_precedes(Some(&dir), Some("song_data/A/B/TRB.json")));
        assert!(!dir_precedes(Some(&dir), Some("song_data/A/A/TRA.json")));
        assert!(!dir_precedes(Some(&dir), Some("song_data/A/A.json")));
        assert!(!dir_precedes(Some(&dir), None));
        assert!(!dir_precedes(None, Some("song_data/Z.json")));
    }
}
