//! Bucket handles over `object_store` backends

use crate::error::{Error, Result};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::fmt;
use std::sync::Arc;

/// Join key segments with `/`, ignoring empty segments and stray slashes
pub fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// One bucket (or container, or local directory) of an object store
#[derive(Clone)]
pub struct ObjectSource {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// URL scheme (s3, gs, az, file, memory)
    scheme: String,
    /// Bucket, container or root directory
    bucket: String,
    /// Key prefix taken from the URL path
    base: String,
}

impl fmt::Debug for ObjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSource")
            .field("scheme", &self.scheme)
            .field("bucket", &self.bucket)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl ObjectSource {
    /// Parse a bucket URL and create the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` or `s3a://bucket/path/` - AWS S3
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `memory://name/path/` - fresh in-memory store
    /// - `/local/path/`, `./path/` or `file:///path/` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            Self::parse_s3(rest)
        } else if let Some(rest) = url.strip_prefix("s3a://") {
            Self::parse_s3(rest)
        } else if let Some(rest) = url.strip_prefix("gs://") {
            Self::parse_gcs(rest)
        } else if let Some(rest) = url.strip_prefix("az://") {
            Self::parse_azure(rest)
        } else if let Some(rest) = url.strip_prefix("memory://") {
            let (name, base) = split_bucket(rest);
            Ok(Self::in_memory(name).with_base(base))
        } else if url.starts_with("file://") {
            let parsed = url::Url::parse(url)
                .map_err(|e| Error::config(format!("Invalid file URL {url}: {e}")))?;
            let path = parsed
                .to_file_path()
                .map_err(|()| Error::config(format!("Invalid file URL: {url}")))?;
            Self::parse_local(&path.to_string_lossy())
        } else if url.contains("://") {
            Err(Error::config(format!("Unsupported storage URL: {url}")))
        } else {
            Self::parse_local(url)
        }
    }

    /// Wrap an existing store
    pub fn from_store(
        scheme: impl Into<String>,
        bucket: impl Into<String>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            store,
            scheme: scheme.into(),
            bucket: bucket.into(),
            base: String::new(),
        }
    }

    /// Create a source backed by a fresh in-memory store
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self::from_store("memory", bucket, Arc::new(InMemory::new()))
    }

    /// Set the key prefix every key of this source lives under
    #[must_use]
    pub fn with_base(mut self, base: impl AsRef<str>) -> Self {
        self.base = join_key(&[base.as_ref()]);
        self
    }

    fn parse_s3(without_scheme: &str) -> Result<Self> {
        let (bucket, base) = split_bucket(without_scheme);
        if bucket.is_empty() {
            return Err(Error::config("S3 URL is missing a bucket name"));
        }

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;

        Ok(Self::from_store("s3", bucket, Arc::new(store)).with_base(base))
    }

    fn parse_gcs(without_scheme: &str) -> Result<Self> {
        let (bucket, base) = split_bucket(without_scheme);
        if bucket.is_empty() {
            return Err(Error::config("GCS URL is missing a bucket name"));
        }

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self::from_store("gs", bucket, Arc::new(store)).with_base(base))
    }

    fn parse_azure(without_scheme: &str) -> Result<Self> {
        let (container, base) = split_bucket(without_scheme);
        if container.is_empty() {
            return Err(Error::config("Azure URL is missing a container name"));
        }

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self::from_store("az", container, Arc::new(store)).with_base(base))
    }

    fn parse_local(path: &str) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self::from_store("file", path.trim_end_matches('/'), Arc::new(store)))
    }

    /// Check if this is a cloud source (not local or in-memory)
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }

    /// Get the scheme (s3, gs, az, file, memory)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the key prefix from the URL path
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Resolve a key relative to the base prefix into a full key
    pub fn key(&self, relative: &str) -> String {
        join_key(&[&self.base, relative])
    }

    /// Render a full key as a URL for logs and errors
    pub fn url_for(&self, key: &str) -> String {
        format!("{}://{}/{key}", self.scheme, self.bucket.trim_start_matches('/'))
    }

    /// Fetch the full body of an object
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = object_path(key)?;
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| Error::retrieval(self.url_for(key), e.to_string()))?;
        result
            .bytes()
            .await
            .map_err(|e| Error::retrieval(self.url_for(key), e.to_string()))
    }
}

/// Convert a raw key into an object store path without re-encoding it
pub fn object_path(key: &str) -> Result<ObjectPath> {
    ObjectPath::parse(key).map_err(|e| Error::config(format!("Invalid object key '{key}': {e}")))
}

/// Like [`object_path`], mapping an empty key to `None` (the store root)
pub fn object_path_opt(key: &str) -> Result<Option<ObjectPath>> {
    if key.is_empty() {
        Ok(None)
    } else {
        object_path(key).map(Some)
    }
}

fn split_bucket(without_scheme: &str) -> (&str, &str) {
    match without_scheme.find('/') {
        Some(idx) => (&without_scheme[..idx], &without_scheme[idx + 1..]),
        None => (without_scheme, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::PutPayload;

    #[test]
    fn test_join_key() {
        assert_eq!(join_key(&["analytics/", "/songs", ""]), "analytics/songs");
        assert_eq!(join_key(&["", "log_data"]), "log_data");
        assert_eq!(join_key(&[]), "");
    }

    #[test]
    fn test_parse_memory_url() {
        let source = ObjectSource::parse("memory://test-bucket/analytics/").unwrap();
        assert_eq!(source.scheme(), "memory");
        assert_eq!(source.bucket(), "test-bucket");
        assert_eq!(source.base(), "analytics");
        assert_eq!(source.key("songs"), "analytics/songs");
        assert!(!source.is_cloud());
    }

    #[test]
    fn test_parse_local_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().to_str().unwrap();
        let source = ObjectSource::parse(path).unwrap();
        assert_eq!(source.scheme(), "file");
        assert!(!source.is_cloud());
        assert_eq!(source.base(), "");
    }

    #[test]
    fn test_parse_unknown_scheme() {
        let err = ObjectSource::parse("ftp://example.com/data").unwrap_err();
        assert!(err.to_string().contains("Unsupported storage URL"));
    }

    #[test]
    fn test_url_for() {
        let source = ObjectSource::in_memory("udacity-dend");
        assert_eq!(
            source.url_for("song_data/A/A/A/TRAAAAW.json"),
            "memory://udacity-dend/song_data/A/A/A/TRAAAAW.json"
        );
    }

    #[tokio::test]
    async fn test_get_roundtrip_and_missing() {
        let source = ObjectSource::in_memory("bucket");
        let path = object_path("log_data/2018/11/events.json").unwrap();
        source
            .store()
            .put(&path, PutPayload::from_static(b"{}\n"))
            .await
            .unwrap();

        let body = source.get("log_data/2018/11/events.json").await.unwrap();
        assert_eq!(body.as_ref(), b"{}\n");

        let err = source.get("log_data/missing.json").await.unwrap_err();
        assert!(matches!(err, Error::Retrieval { .. }));
        assert!(err.is_retryable());
    }
}
