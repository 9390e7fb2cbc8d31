//! Source row schemas
//!
//! Field names follow the source JSON; the domain names are accepted as
//! aliases so hand-written fixtures can use either.

use crate::error::Result;
use crate::types::OptionStringExt;
use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// `event_type` of the only events that reach the output tables
pub const PLAY_EVENT: &str = "NextSong";

// ============================================================================
// Catalog Records
// ============================================================================

/// One catalog object (a song and its artist)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRecord {
    #[serde(rename = "song_id", alias = "catalog_id")]
    pub catalog_id: String,

    pub title: String,

    #[serde(rename = "artist_id", alias = "creator_id")]
    pub creator_id: String,

    #[serde(rename = "artist_name", alias = "creator_name", default)]
    pub creator_name: Option<String>,

    #[serde(rename = "artist_location", alias = "creator_location", default)]
    pub creator_location: Option<String>,

    #[serde(rename = "artist_latitude", alias = "creator_lat", default)]
    pub creator_lat: Option<f64>,

    #[serde(rename = "artist_longitude", alias = "creator_lon", default)]
    pub creator_lon: Option<f64>,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub duration: Option<f64>,
}

impl CatalogRecord {
    /// Arrow schema of a catalog row set
    pub fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("catalog_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("creator_id", DataType::Utf8, false),
            Field::new("creator_name", DataType::Utf8, true),
            Field::new("creator_location", DataType::Utf8, true),
            Field::new("creator_lat", DataType::Float64, true),
            Field::new("creator_lon", DataType::Float64, true),
            Field::new("year", DataType::Int32, true),
            Field::new("duration", DataType::Float64, true),
        ]))
    }

    /// Build a RecordBatch from catalog rows
    pub fn to_batch(records: &[CatalogRecord]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.catalog_id.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.title.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.creator_id.as_str()),
            )),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.creator_name.as_deref()),
            )),
            Arc::new(StringArray::from_iter(
                records.iter().map(|r| r.creator_location.as_deref()),
            )),
            Arc::new(Float64Array::from_iter(records.iter().map(|r| r.creator_lat))),
            Arc::new(Float64Array::from_iter(records.iter().map(|r| r.creator_lon))),
            Arc::new(Int32Array::from_iter(records.iter().map(|r| r.year))),
            Arc::new(Float64Array::from_iter(records.iter().map(|r| r.duration))),
        ];

        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

// ============================================================================
// Event Records
// ============================================================================

/// One user action from the event log
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "page", alias = "event_type")]
    pub event_type: String,

    #[serde(rename = "ts", alias = "epoch_ms_timestamp")]
    pub epoch_ms_timestamp: i64,

    #[serde(
        rename = "userId",
        alias = "user_id",
        default,
        deserialize_with = "lenient_id"
    )]
    pub user_id: Option<String>,

    #[serde(rename = "firstName", alias = "user_first_name", default)]
    pub user_first_name: Option<String>,

    #[serde(rename = "lastName", alias = "user_last_name", default)]
    pub user_last_name: Option<String>,

    #[serde(rename = "gender", alias = "user_gender", default)]
    pub user_gender: Option<String>,

    #[serde(rename = "level", alias = "subscription_level", default)]
    pub subscription_level: Option<String>,

    #[serde(rename = "sessionId", alias = "session_id", default)]
    pub session_id: Option<i64>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(rename = "userAgent", alias = "user_agent", default)]
    pub user_agent: Option<String>,

    #[serde(rename = "song", alias = "catalog_title", default)]
    pub catalog_title: Option<String>,
}

impl EventRecord {
    /// Check if this event is a song play
    pub fn is_play(&self) -> bool {
        self.event_type == PLAY_EVENT
    }

    /// Arrow schema of an event row set
    pub fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("event_type", DataType::Utf8, false),
            Field::new("epoch_ms_timestamp", DataType::Int64, false),
            Field::new("user_id", DataType::Utf8, true),
            Field::new("user_first_name", DataType::Utf8, true),
            Field::new("user_last_name", DataType::Utf8, true),
            Field::new("user_gender", DataType::Utf8, true),
            Field::new("subscription_level", DataType::Utf8, true),
            Field::new("session_id", DataType::Int64, true),
            Field::new("location", DataType::Utf8, true),
            Field::new("user_agent", DataType::Utf8, true),
            Field::new("catalog_title", DataType::Utf8, true),
        ]))
    }

    /// Build a RecordBatch from event rows
    pub fn to_batch(records: &[EventRecord]) -> Result<RecordBatch> {
        let strings = |f: fn(&EventRecord) -> Option<&str>| -> ArrayRef {
            Arc::new(StringArray::from_iter(records.iter().map(f)))
        };

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.event_type.as_str()),
            )),
            Arc::new(Int64Array::from_iter_values(
                records.iter().map(|r| r.epoch_ms_timestamp),
            )),
            strings(|r| r.user_id.as_deref()),
            strings(|r| r.user_first_name.as_deref()),
            strings(|r| r.user_last_name.as_deref()),
            strings(|r| r.user_gender.as_deref()),
            strings(|r| r.subscription_level.as_deref()),
            Arc::new(Int64Array::from_iter(records.iter().map(|r| r.session_id))),
            strings(|r| r.location.as_deref()),
            strings(|r| r.user_agent.as_deref()),
            strings(|r| r.catalog_title.as_deref()),
        ];

        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

/// Accept string or numeric ids; empty strings become `None`
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value
        .map(|v| match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        })
        .none_if_empty())
}
