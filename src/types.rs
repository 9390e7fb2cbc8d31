//! Common types used throughout star-etl
//!
//! This module contains shared type definitions and small utility types
//! used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Dataset Kind
// ============================================================================

/// The two source datasets the pipeline extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Catalog records (one JSON object per song)
    Catalog,
    /// Event records (one JSON object per user action)
    Events,
}

impl DatasetKind {
    /// Name used in logs and CLI arguments
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Catalog => "catalog",
            DatasetKind::Events => "events",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Malformed Record Policy
// ============================================================================

/// What the reader does with a line that is not a valid record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRecordPolicy {
    /// Stop the read on the first malformed line
    #[default]
    Abort,
    /// Skip the line, log a warning and count it
    Skip,
}

// ============================================================================
// Output Tables
// ============================================================================

/// Names and partition layouts of the five output tables
pub mod tables {
    /// Catalog dimension
    pub const SONGS: &str = "songs";
    /// Creator dimension
    pub const ARTISTS: &str = "artists";
    /// User dimension
    pub const USERS: &str = "users";
    /// Time dimension
    pub const TIME: &str = "time";
    /// Play fact table
    pub const SONGPLAYS: &str = "songplays";

    /// Partition columns of `songs`
    pub const SONGS_PARTITIONS: &[&str] = &["year", "creator_id"];
    /// Partition columns of `time`
    pub const TIME_PARTITIONS: &[&str] = &["year", "month"];
    /// Partition columns of `songplays`
    pub const SONGPLAYS_PARTITIONS: &[&str] = &["year", "month"];
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
