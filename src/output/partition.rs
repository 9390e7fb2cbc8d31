//! Hive-style partitioning
//!
//! A partitioned table stores each distinct combination of partition values
//! under `col1=value1/col2=value2/`; the partition columns themselves are
//! dropped from the files and recovered from the path on read.

use crate::error::{Error, Result};
use arrow::array::{Array, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Directory value used for null partition values
///
/// An empty string keeps its own `column=` directory and reads back as `""`.
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Partition column name and its value (`None` for null)
pub type PartitionValue = (String, Option<String>);

/// The rows of one partition, partition columns removed
#[derive(Debug, Clone)]
pub struct PartitionSlice {
    /// Partition values in partition column order
    pub values: Vec<PartitionValue>,
    /// Non-partition columns of the matching rows
    pub batch: RecordBatch,
}

impl PartitionSlice {
    /// Relative directory of this partition (empty when unpartitioned)
    pub fn dir(&self) -> String {
        partition_dir(&self.values)
    }
}

/// Render partition values as a relative directory path
pub fn partition_dir(values: &[PartitionValue]) -> String {
    values
        .iter()
        .map(|(column, value)| {
            let value = match value.as_deref() {
                Some(v) => escape_partition_value(v),
                None => DEFAULT_PARTITION.to_string(),
            };
            format!("{}={value}", escape_partition_value(column))
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a batch into one slice per distinct partition value combination,
/// in order of first appearance
pub fn split_partitions(batch: &RecordBatch, partition_by: &[&str]) -> Result<Vec<PartitionSlice>> {
    if partition_by.is_empty() {
        return Ok(vec![PartitionSlice {
            values: Vec::new(),
            batch: batch.clone(),
        }]);
    }

    let schema = batch.schema();
    let mut partition_idx = Vec::with_capacity(partition_by.len());
    for column in partition_by {
        let idx = schema
            .index_of(column)
            .map_err(|_| Error::schema(format!("partition column '{column}' not found")))?;
        if partition_idx.contains(&idx) {
            return Err(Error::schema(format!(
                "partition column '{column}' listed twice"
            )));
        }
        partition_idx.push(idx);
    }

    let data_idx: Vec<usize> = (0..schema.fields().len())
        .filter(|idx| !partition_idx.contains(idx))
        .collect();
    if data_idx.is_empty() {
        return Err(Error::schema("every column is a partition column"));
    }
    let data = batch.project(&data_idx)?;

    let mut order: Vec<Vec<Option<String>>> = Vec::new();
    let mut groups: HashMap<Vec<Option<String>>, Vec<u32>> = HashMap::new();

    for row in 0..batch.num_rows() {
        let key = partition_idx
            .iter()
            .map(|idx| {
                let column = batch.column(*idx);
                if column.is_null(row) {
                    Ok(None)
                } else {
                    array_value_to_string(column.as_ref(), row).map(Some)
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        groups
            .entry(key)
            .or_insert_with_key(|key| {
                order.push(key.clone());
                Vec::new()
            })
            .push(row as u32);
    }

    order
        .into_iter()
        .map(|key| {
            let indices = UInt32Array::from(groups.remove(&key).unwrap_or_default());
            let values = partition_by
                .iter()
                .map(|c| (*c).to_string())
                .zip(key)
                .collect();
            Ok(PartitionSlice {
                values,
                batch: take_record_batch(&data, &indices)?,
            })
        })
        .collect()
}

/// Percent-encode everything outside `[A-Za-z0-9._- ]`
pub fn escape_partition_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-' | ' ') {
            escaped.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                let _ = write!(escaped, "%{byte:02X}");
            }
        }
    }
    escaped
}

/// Reverse [`escape_partition_value`]
pub fn unescape_partition_value(value: &str) -> Result<String> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::schema(format!("bad escape in partition value '{value}'")))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded)
        .map_err(|_| Error::schema(format!("partition value '{value}' is not UTF-8")))
}

/// Parse a `column=value` directory segment
pub fn parse_partition_segment(segment: &str) -> Result<PartitionValue> {
    let (column, value) = segment
        .split_once('=')
        .ok_or_else(|| Error::schema(format!("'{segment}' is not a partition directory")))?;

    let column = unescape_partition_value(column)?;
    let value = if value == DEFAULT_PARTITION {
        None
    } else {
        Some(unescape_partition_value(value)?)
    };

    Ok((column, value))
}
