//! Error types for star-etl
//!
//! This module defines the error hierarchy for the whole pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! No variant is retried internally; `is_retryable` only tells an outer
//! orchestration layer which failures are worth another attempt.

use thiserror::Error;

/// The main error type for star-etl
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Retrieval Errors
    // ============================================================================
    #[error("Failed to retrieve '{location}': {message}")]
    Retrieval { location: String, message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ============================================================================
    // Record Errors
    // ============================================================================
    #[error("Malformed record in '{location}' at line {line}: {message}")]
    Parse {
        location: String,
        line: usize,
        message: String,
    },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },

    #[error("Join integrity error on '{field}': {message}")]
    JoinIntegrity { field: String, message: String },

    // ============================================================================
    // Arrow/Parquet Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Failed to write table '{table}': {message}")]
    Write { table: String, message: String },

    #[error("Table '{table}' has no committed output")]
    TableNotCommitted { table: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a retrieval error for an object or listing location
    pub fn retrieval(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a per-line parse error
    pub fn parse(location: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            location: location.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a schema validation error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            message: message.into(),
        }
    }

    /// Create a join integrity error
    pub fn join_integrity(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JoinIntegrity {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Check if an outer orchestration layer may retry the run
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Retrieval { .. } | Error::ObjectStore(_))
    }
}

/// Result type alias for star-etl
pub type Result<T> = std::result::Result<T, Error>;
