//! Timestamp derivation and the time dimension
//!
//! All calendar fields are computed in UTC.

use crate::decode::EventRecord;
use crate::error::{Error, Result};
use arrow::array::{ArrayRef, Int32Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Calendar fields of one event timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub start_time: DateTime<Utc>,
    pub hour: i32,
    /// Day of month
    pub day: i32,
    /// ISO week number
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// 1 = Sunday ... 7 = Saturday
    pub weekday: i32,
}

impl TimeFields {
    /// Milliseconds since the epoch
    pub fn epoch_millis(&self) -> i64 {
        self.start_time.timestamp_millis()
    }
}

/// Derive calendar fields from an epoch-millisecond timestamp
pub fn derive_time_fields(epoch_ms: i64) -> Result<TimeFields> {
    let start_time = DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .ok_or_else(|| Error::schema(format!("timestamp {epoch_ms} is out of range")))?;

    Ok(TimeFields {
        start_time,
        hour: start_time.hour() as i32,
        day: start_time.day() as i32,
        week: start_time.iso_week().week() as i32,
        month: start_time.month() as i32,
        year: start_time.year(),
        weekday: start_time.weekday().number_from_sunday() as i32,
    })
}

/// Arrow schema of the `time` table
pub fn time_dim_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(
            "start_time",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        ),
        Field::new("hour", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
        Field::new("week", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("year", DataType::Int32, false),
        Field::new("weekday", DataType::Int32, false),
    ]))
}

/// Build the `time` table: one row per distinct event timestamp, in order
/// of first appearance
pub fn build_time_dim(events: &[EventRecord]) -> Result<RecordBatch> {
    let mut seen = HashSet::new();
    let rows = events
        .iter()
        .filter(|e| seen.insert(e.epoch_ms_timestamp))
        .map(|e| derive_time_fields(e.epoch_ms_timestamp))
        .collect::<Result<Vec<_>>>()?;

    let int_column = |f: fn(&TimeFields) -> i32| -> ArrayRef {
        Arc::new(Int32Array::from_iter_values(rows.iter().map(f)))
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(
            TimestampMillisecondArray::from_iter_values(rows.iter().map(TimeFields::epoch_millis))
                .with_timezone("UTC"),
        ),
        int_column(|t| t.hour),
        int_column(|t| t.day),
        int_column(|t| t.week),
        int_column(|t| t.month),
        int_column(|t| t.year),
        int_column(|t| t.weekday),
    ];

    Ok(RecordBatch::try_new(time_dim_schema(), columns)?)
}
