//! Partitioned table writer with a staged commit
//!
//! A table is written in three steps:
//!
//! 1. every partition file is staged under `<table>/_temporary/<attempt>/`
//! 2. the previous `_SUCCESS` marker and the previous table files are deleted
//! 3. staged files are renamed into place and a fresh `_SUCCESS` is written
//!
//! Readers only accept a table carrying `_SUCCESS`, so a failed write never
//! looks like a complete table.

use super::partition::{parse_partition_segment, split_partitions, PartitionSlice, PartitionValue};
use super::writer::{decode_parquet, encode_parquet, ParquetWriterConfig};
use crate::error::{Error, Result};
use crate::storage::{join_key, object_path, ObjectSource};
use arrow::array::{new_null_array, ArrayRef, StringArray};
use arrow::compute::{cast, cast_with_options, CastOptions};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use futures::TryStreamExt;
use object_store::PutPayload;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Marker object of a committed table
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Directory holding in-flight attempts
pub const STAGING_DIR: &str = "_temporary";

/// What one `write_table` call produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWriteSummary {
    /// Table name
    pub table: String,
    /// Rows written
    pub rows: usize,
    /// Parquet files written
    pub files: usize,
    /// Partition directories written (0 when unpartitioned)
    pub partitions: usize,
}

/// Writes and reads partitioned Parquet tables under one output root
#[derive(Debug, Clone)]
pub struct PartitionedWriter {
    root: ObjectSource,
    parquet: ParquetWriterConfig,
}

impl PartitionedWriter {
    /// Create a writer rooted at `root` (its base prefix is the table parent)
    pub fn new(root: ObjectSource) -> Self {
        Self {
            root,
            parquet: ParquetWriterConfig::default(),
        }
    }

    /// Create a writer from an output URL
    pub fn parse(url: &str) -> Result<Self> {
        ObjectSource::parse(url).map(Self::new)
    }

    /// Set the Parquet encoding
    #[must_use]
    pub fn with_parquet_config(mut self, config: ParquetWriterConfig) -> Self {
        self.parquet = config;
        self
    }

    /// The output root
    pub fn root(&self) -> &ObjectSource {
        &self.root
    }

    /// Full key of a table directory
    pub fn table_key(&self, table: &str) -> String {
        self.root.key(table)
    }

    /// URL of a table directory, for logs
    pub fn table_url(&self, table: &str) -> String {
        self.root.url_for(&self.table_key(table))
    }

    /// Check if a table has a `_SUCCESS` marker
    pub async fn is_committed(&self, table: &str) -> Result<bool> {
        let marker = object_path(&join_key(&[&self.table_key(table), SUCCESS_MARKER]))?;
        match self.root.store().head(&marker).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(Error::retrieval(self.table_url(table), e.to_string())),
        }
    }

    /// Replace `table` with the rows of `batch`, partitioned by `partition_by`
    ///
    /// An empty batch still commits a table: one file when unpartitioned,
    /// no files when partitioned.
    pub async fn write_table(
        &self,
        table: &str,
        batch: &RecordBatch,
        partition_by: &[&str],
    ) -> Result<TableWriteSummary> {
        let slices = split_partitions(batch, partition_by)
            .map_err(|e| Error::write(table, e.to_string()))?;

        let table_key = self.table_key(table);
        let attempt = Utc::now().format("%Y%m%d%H%M%S%6f").to_string();
        let staging = join_key(&[&table_key, STAGING_DIR, &attempt]);

        let mut moves = Vec::with_capacity(slices.len());
        for (idx, slice) in slices.iter().enumerate() {
            let relative = join_key(&[&slice.dir(), &format!("part-{idx:05}.parquet")]);
            moves.push(StagedFile {
                staged: join_key(&[&staging, &relative]),
                target: join_key(&[&table_key, &relative]),
                staged_done: false,
                moved: false,
            });
        }

        debug!(
            "Writing table '{}' ({} rows, {} partitions) via {}",
            table,
            batch.num_rows(),
            slices.len(),
            staging
        );

        let result = self.stage_and_commit(&table_key, &staging, &slices, &mut moves).await;

        match result {
            Ok(()) => {
                let summary = TableWriteSummary {
                    table: table.to_string(),
                    rows: batch.num_rows(),
                    files: moves.len(),
                    partitions: if partition_by.is_empty() { 0 } else { slices.len() },
                };
                info!(
                    "Committed table '{}' to {}: {} rows in {} files",
                    table,
                    self.table_url(table),
                    summary.rows,
                    summary.files
                );
                Ok(summary)
            }
            Err(e) => {
                warn!("Write of table '{}' failed, cleaning up: {}", table, e);
                self.cleanup(&moves).await;
                Err(match e {
                    Error::Write { .. } => e,
                    other => Error::write(table, other.to_string()),
                })
            }
        }
    }

    async fn stage_and_commit(
        &self,
        table_key: &str,
        staging: &str,
        slices: &[PartitionSlice],
        moves: &mut [StagedFile],
    ) -> Result<()> {
        let store = self.root.store();

        // Stage
        for (slice, file) in slices.iter().zip(moves.iter_mut()) {
            let data = encode_parquet(&slice.batch, &self.parquet)?;
            store
                .put(&object_path(&file.staged)?, PutPayload::from(data))
                .await?;
            file.staged_done = true;
        }

        // Drop the previous version, keeping this attempt's staged files
        self.delete_if_exists(&join_key(&[table_key, SUCCESS_MARKER]))
            .await?;

        let staging_prefix = format!("{staging}/");
        let existing: Vec<String> = store
            .list(Some(&object_path(table_key)?))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        for key in existing.iter().filter(|k| !k.starts_with(&staging_prefix)) {
            self.delete_if_exists(key).await?;
        }

        // Publish
        for file in moves.iter_mut() {
            store
                .rename(&object_path(&file.staged)?, &object_path(&file.target)?)
                .await?;
            file.moved = true;
        }

        store
            .put(
                &object_path(&join_key(&[table_key, SUCCESS_MARKER]))?,
                PutPayload::default(),
            )
            .await?;

        Ok(())
    }

    async fn delete_if_exists(&self, key: &str) -> Result<()> {
        match self.root.store().delete(&object_path(key)?).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn cleanup(&self, moves: &[StagedFile]) {
        for file in moves {
            let key = if file.moved {
                &file.target
            } else if file.staged_done {
                &file.staged
            } else {
                continue;
            };
            if let Err(e) = self.delete_if_exists(key).await {
                warn!("Failed to remove {}: {}", self.root.url_for(key), e);
            }
        }
    }

    /// Read a committed table back, restoring partition columns from paths
    ///
    /// Columns are returned in `schema` order. Files are read in key order.
    pub async fn read_table(&self, table: &str, schema: &SchemaRef) -> Result<Vec<RecordBatch>> {
        if !self.is_committed(table).await? {
            return Err(Error::TableNotCommitted {
                table: table.to_string(),
            });
        }

        let table_key = self.table_key(table);
        let mut keys: Vec<String> = self
            .root
            .store()
            .list(Some(&object_path(&table_key)?))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|e| Error::retrieval(self.table_url(table), e.to_string()))?;
        keys.sort();

        let mut batches = Vec::new();
        for key in &keys {
            let relative = key
                .strip_prefix(table_key.as_str())
                .unwrap_or(key)
                .trim_start_matches('/');
            let segments: Vec<&str> = relative.split('/').collect();
            if segments
                .iter()
                .any(|s| s.starts_with('_') || s.starts_with('.'))
                || !relative.ends_with(".parquet")
            {
                continue;
            }

            let partitions = segments[..segments.len() - 1]
                .iter()
                .map(|s| parse_partition_segment(s))
                .collect::<Result<Vec<_>>>()?;

            for batch in decode_parquet(self.root.get(key).await?)? {
                batches.push(restore_columns(&batch, &partitions, schema)?);
            }
        }

        debug!(
            "Read table '{}': {} files, {} rows",
            table,
            keys.len(),
            batches.iter().map(RecordBatch::num_rows).sum::<usize>()
        );

        Ok(batches)
    }
}

#[derive(Debug)]
struct StagedFile {
    staged: String,
    target: String,
    staged_done: bool,
    moved: bool,
}

/// Rebuild a full-schema batch from a file batch plus its partition values
fn restore_columns(
    batch: &RecordBatch,
    partitions: &[PartitionValue],
    schema: &SchemaRef,
) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };

    let columns = schema
        .fields()
        .iter()
        .map(|field| -> Result<ArrayRef> {
            if let Some(column) = batch.column_by_name(field.name()) {
                if column.data_type() == field.data_type() {
                    return Ok(Arc::clone(column));
                }
                return Ok(cast(column, field.data_type())?);
            }

            if let Some((_, value)) = partitions.iter().find(|(name, _)| name == field.name()) {
                let strings = StringArray::from(vec![value.as_deref(); rows]);
                return Ok(cast_with_options(&strings, field.data_type(), &strict)?);
            }

            if field.is_nullable() {
                Ok(new_null_array(field.data_type(), rows))
            } else {
                Err(Error::schema(format!(
                    "required column '{}' is missing",
                    field.name()
                )))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}
