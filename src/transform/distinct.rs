//! Distinct projections over Arrow record batches
//!
//! Rows are compared through the Arrow row format, so every column type
//! (floats and nulls included) has a well-defined identity.

use crate::error::{Error, Result};
use arrow::array::{ArrayRef, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use tracing::warn;

/// One output column of a projection: a source column, optionally renamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Column name in the input batch
    pub source: String,
    /// Column name in the output batch
    pub name: String,
}

/// Project a column under its own name
pub fn col(name: impl Into<String>) -> Projection {
    let name = name.into();
    Projection {
        source: name.clone(),
        name,
    }
}

impl Projection {
    /// Rename the output column
    #[must_use]
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Project `output` columns and drop rows whose full output tuple was
/// already seen, keeping first occurrences in input order
///
/// `key_columns` name output columns forming the natural key. Rows are not
/// collapsed by key; keys that end up with more than one distinct tuple are
/// logged.
pub fn distinct_projection(
    batch: &RecordBatch,
    key_columns: &[&str],
    output: &[Projection],
) -> Result<RecordBatch> {
    let projected = project(batch, output)?;

    for key in key_columns {
        if projected.schema().index_of(key).is_err() {
            return Err(Error::schema(format!(
                "key column '{key}' is not part of the projection"
            )));
        }
    }

    if projected.num_rows() == 0 {
        return Ok(projected);
    }

    let keep = first_occurrences(projected.columns())?;
    let distinct = if keep.len() == projected.num_rows() {
        projected
    } else {
        take_record_batch(&projected, &UInt32Array::from(keep))?
    };

    let collisions = key_collisions(&distinct, key_columns)?;
    if collisions > 0 {
        warn!(
            "{} key value(s) of ({}) map to more than one distinct row",
            collisions,
            key_columns.join(", ")
        );
    }

    Ok(distinct)
}

/// Count key values that appear in more than one row of `batch`
pub fn key_collisions(batch: &RecordBatch, key_columns: &[&str]) -> Result<usize> {
    if key_columns.is_empty() || batch.num_rows() == 0 {
        return Ok(0);
    }

    let columns = key_columns
        .iter()
        .map(|name| {
            batch
                .column_by_name(name)
                .cloned()
                .ok_or_else(|| Error::schema(format!("key column '{name}' not found")))
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    let rows = row_converter(&columns)?.convert_columns(&columns)?;
    let mut counts: HashMap<_, usize> = HashMap::new();
    for row in rows.iter() {
        *counts.entry(row).or_default() += 1;
    }

    Ok(counts.values().filter(|count| **count > 1).count())
}

/// Keep the first row for each key, in input order
pub fn dedup_by_key<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(key(row))).collect()
}

fn project(batch: &RecordBatch, output: &[Projection]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(output.len());
    let mut columns = Vec::with_capacity(output.len());

    for projection in output {
        let idx = schema.index_of(&projection.source).map_err(|_| {
            Error::schema(format!("column '{}' not found", projection.source))
        })?;
        let field = schema.field(idx);
        fields.push(Field::new(
            &projection.name,
            field.data_type().clone(),
            field.is_nullable(),
        ));
        columns.push(Arc::clone(batch.column(idx)));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn row_converter(columns: &[ArrayRef]) -> Result<RowConverter> {
    let fields = columns
        .iter()
        .map(|c| SortField::new(c.data_type().clone()))
        .collect();
    Ok(RowConverter::new(fields)?)
}

fn first_occurrences(columns: &[ArrayRef]) -> Result<Vec<u32>> {
    let rows = row_converter(columns)?.convert_columns(columns)?;
    let mut seen = HashSet::with_capacity(rows.num_rows());
    let mut keep = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        if seen.insert(row) {
            keep.push(idx as u32);
        }
    }

    Ok(keep)
}
