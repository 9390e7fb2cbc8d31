//! Catalog, creator and user dimensions

use super::distinct::{col, distinct_projection};
use crate::error::Result;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Build `songs` from a catalog batch
pub fn build_catalog_dim(catalog: &RecordBatch) -> Result<RecordBatch> {
    distinct_projection(
        catalog,
        &["catalog_id"],
        &[
            col("catalog_id"),
            col("title"),
            col("creator_id"),
            col("year"),
            col("duration"),
        ],
    )
}

/// Build `artists` from a catalog batch
pub fn build_creator_dim(catalog: &RecordBatch) -> Result<RecordBatch> {
    distinct_projection(
        catalog,
        &["creator_id"],
        &[
            col("creator_id"),
            col("creator_name").alias("name"),
            col("creator_location").alias("location"),
            col("creator_lat").alias("lat"),
            col("creator_lon").alias("lon"),
        ],
    )
}

/// Build `users` from a batch of play events
///
/// A user whose subscription level changed keeps one row per level.
pub fn build_user_dim(events: &RecordBatch) -> Result<RecordBatch> {
    distinct_projection(
        events,
        &["user_id"],
        &[
            col("user_id"),
            col("user_first_name").alias("first_name"),
            col("user_last_name").alias("last_name"),
            col("user_gender").alias("gender"),
            col("subscription_level"),
        ],
    )
}

/// Arrow schema of the `songs` table
pub fn catalog_dim_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("catalog_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("creator_id", DataType::Utf8, false),
        Field::new("year", DataType::Int32, true),
        Field::new("duration", DataType::Float64, true),
    ]))
}

/// Arrow schema of the `artists` table
pub fn creator_dim_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("creator_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("lat", DataType::Float64, true),
        Field::new("lon", DataType::Float64, true),
    ]))
}

/// Arrow schema of the `users` table
pub fn user_dim_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Utf8, true),
        Field::new("first_name", DataType::Utf8, true),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("subscription_level", DataType::Utf8, true),
    ]))
}
