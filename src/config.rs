//! Pipeline configuration
//!
//! The whole run is described by one [`PipelineConfig`], loaded from YAML and
//! passed explicitly into the pipeline. Credentials are never part of it; the
//! object store builders read them from the environment.

use crate::error::{Error, Result};
use crate::output::ParquetWriterConfig;
use crate::types::MalformedRecordPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Largest page the object store listing APIs will return
pub const MAX_PAGE_SIZE: usize = 1000;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Where catalog objects live
    pub catalog: SourceConfig,

    /// Where event objects live
    pub events: SourceConfig,

    /// Destination for the five output tables
    pub output: OutputConfig,

    /// Object listing settings
    #[serde(default)]
    pub listing: ListingConfig,

    /// Record reading settings
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Parquet encoding settings
    #[serde(default)]
    pub parquet: ParquetSettings,
}

impl PipelineConfig {
    /// Check every field that can be checked without touching the network
    pub fn validate(&self) -> Result<()> {
        self.catalog.validate("catalog")?;
        self.events.validate("events")?;

        if self.output.url.trim().is_empty() {
            return Err(Error::invalid_value("output.url", "cannot be empty"));
        }

        if self.listing.page_size == 0 || self.listing.page_size > MAX_PAGE_SIZE {
            return Err(Error::invalid_value(
                "listing.page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        if self.listing.suffix.is_empty() {
            return Err(Error::invalid_value("listing.suffix", "cannot be empty"));
        }

        if self.reader.concurrency == 0 {
            return Err(Error::invalid_value(
                "reader.concurrency",
                "must be at least 1",
            ));
        }

        if self.parquet.row_group_size == 0 {
            return Err(Error::invalid_value(
                "parquet.row_group_size",
                "must be at least 1",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Sources and Destination
// ============================================================================

/// A bucket URL plus the key prefix holding one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Bucket URL, e.g. `s3://udacity-dend`
    pub url: String,

    /// Key prefix under the bucket, e.g. `song_data`
    #[serde(default)]
    pub prefix: String,
}

impl SourceConfig {
    /// Create a source config
    pub fn new(url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: prefix.into(),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::invalid_value(format!("{name}.url"), "cannot be empty"));
        }
        Ok(())
    }
}

/// Output destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination URL, e.g. `s3://my-bucket/analytics`
    pub url: String,
}

// ============================================================================
// Listing / Reader
// ============================================================================

/// Object listing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Keys requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Required key suffix
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            suffix: default_suffix(),
        }
    }
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_suffix() -> String {
    ".json".to_string()
}

/// Record reading settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Policy for lines that fail to parse
    #[serde(default)]
    pub malformed_records: MalformedRecordPolicy,

    /// Objects fetched concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            malformed_records: MalformedRecordPolicy::default(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}

// ============================================================================
// Parquet
// ============================================================================

/// Compression codec for output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    Uncompressed,
    #[default]
    Snappy,
    Zstd,
    Gzip,
}

/// Parquet encoding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParquetSettings {
    #[serde(default)]
    pub compression: CompressionCodec,

    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,

    /// Dictionary-encode columns
    #[serde(default = "default_true")]
    pub dictionary: bool,

    /// Write page-level column statistics
    #[serde(default = "default_true")]
    pub statistics: bool,
}

impl Default for ParquetSettings {
    fn default() -> Self {
        Self {
            compression: CompressionCodec::default(),
            row_group_size: default_row_group_size(),
            dictionary: true,
            statistics: true,
        }
    }
}

fn default_row_group_size() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

impl ParquetSettings {
    /// Build the writer config these settings describe
    pub fn writer_config(&self) -> ParquetWriterConfig {
        ParquetWriterConfig::new(self.compression, self.row_group_size)
            .with_dictionary(self.dictionary)
            .with_statistics(self.statistics)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and validate a pipeline config from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })?;
    load_config_from_str(&content)
}

/// Load and validate a pipeline config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse pipeline YAML: {e}")))?;
    config.validate()?;
    Ok(config)
}
