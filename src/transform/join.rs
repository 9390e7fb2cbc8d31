//! Event filtering and the event-catalog join

use super::time::derive_time_fields;
use crate::decode::EventRecord;
use crate::error::{Error, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, Int32Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// Filtering
// ============================================================================

/// Keep only events satisfying `predicate`
pub fn filter_events<P>(events: Vec<EventRecord>, predicate: P) -> Vec<EventRecord>
where
    P: Fn(&EventRecord) -> bool,
{
    events.into_iter().filter(|e| predicate(e)).collect()
}

/// The predicate selecting song plays (`event_type == "NextSong"`)
pub fn is_play_event(event: &EventRecord) -> bool {
    event.is_play()
}

// ============================================================================
// Play Ids
// ============================================================================

/// Hands out increasing play ids for one pipeline run
///
/// Ids are unique within the run that owns the generator only. A rerun over
/// the same events hands out fresh ids.
#[derive(Debug, Default)]
pub struct PlayIdGenerator {
    next: AtomicI64,
}

impl PlayIdGenerator {
    /// Create a generator starting at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator starting at `first`
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    /// Take the next id
    pub fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

// ============================================================================
// Catalog Index
// ============================================================================

/// The catalog row a title resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMatch {
    pub catalog_id: String,
    pub creator_id: Option<String>,
}

/// Title lookup over the catalog dimension
///
/// When several catalog rows share a title, the one with the smallest
/// `catalog_id` wins.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    by_title: HashMap<String, CatalogMatch>,
}

impl CatalogIndex {
    /// Index the `title`, `catalog_id` and `creator_id` columns of the batches
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self> {
        let mut index = Self::default();

        for batch in batches {
            let titles = string_column(batch, "title")?;
            let catalog_ids = string_column(batch, "catalog_id")?;
            let creator_ids = string_column(batch, "creator_id")?;
            let titles = titles.as_string::<i32>();
            let catalog_ids = catalog_ids.as_string::<i32>();
            let creator_ids = creator_ids.as_string::<i32>();

            for row in 0..batch.num_rows() {
                if titles.is_null(row) {
                    continue;
                }
                if catalog_ids.is_null(row) {
                    return Err(Error::join_integrity(
                        "catalog_id",
                        format!("catalog row titled '{}' has no id", titles.value(row)),
                    ));
                }

                let candidate = CatalogMatch {
                    catalog_id: catalog_ids.value(row).to_string(),
                    creator_id: (!creator_ids.is_null(row))
                        .then(|| creator_ids.value(row).to_string()),
                };
                index.insert(titles.value(row), candidate);
            }
        }

        Ok(index)
    }

    fn insert(&mut self, title: &str, candidate: CatalogMatch) {
        match self.by_title.get_mut(title) {
            Some(existing) if candidate.catalog_id < existing.catalog_id => *existing = candidate,
            Some(_) => {}
            None => {
                self.by_title.insert(title.to_string(), candidate);
            }
        }
    }

    /// Resolve a title (exact, case-sensitive)
    pub fn lookup(&self, title: &str) -> Option<&CatalogMatch> {
        self.by_title.get(title)
    }

    /// Number of distinct titles
    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    /// Check if the index holds no titles
    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}

fn utf8<'s>(values: impl Iterator<Item = Option<&'s str>>) -> ArrayRef {
    Arc::new(StringArray::from_iter(values))
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    let column = batch.column_by_name(name).ok_or_else(|| {
        Error::join_integrity(name, format!("catalog dimension has no '{name}' column"))
    })?;

    if column.data_type() == &DataType::Utf8 {
        Ok(Arc::clone(column))
    } else {
        Ok(cast(column, &DataType::Utf8)?)
    }
}

// ============================================================================
// Join
// ============================================================================

/// Result of joining events to the catalog
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The `songplays` rows
    pub batch: RecordBatch,
    /// Events without a catalog match
    pub unmatched: usize,
}

struct PlayRow<'a> {
    play_id: i64,
    start_time: i64,
    event: &'a EventRecord,
    matched: &'a CatalogMatch,
    year: i32,
    month: i32,
}

/// Arrow schema of the `songplays` table
pub fn play_fact_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("play_id", DataType::Int64, false),
        Field::new(
            "start_time",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        ),
        Field::new("user_id", DataType::Utf8, true),
        Field::new("subscription_level", DataType::Utf8, true),
        Field::new("catalog_id", DataType::Utf8, false),
        Field::new("creator_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
    ]))
}

/// Inner-join play events to the catalog on `catalog_title == title`
///
/// Events without a match are dropped. An event without a `catalog_title`
/// is a join integrity error. Matched rows take their `play_id` from `ids`
/// in event order.
pub fn join_events_to_catalog(
    events: &[EventRecord],
    catalog: &CatalogIndex,
    ids: &PlayIdGenerator,
) -> Result<JoinOutcome> {
    let mut rows = Vec::new();
    let mut unmatched = 0;

    for event in events {
        let title = event.catalog_title.as_deref().ok_or_else(|| {
            Error::join_integrity(
                "catalog_title",
                format!(
                    "play event at {} in session {:?} has no title",
                    event.epoch_ms_timestamp, event.session_id
                ),
            )
        })?;

        let Some(matched) = catalog.lookup(title) else {
            unmatched += 1;
            continue;
        };

        let time = derive_time_fields(event.epoch_ms_timestamp)?;
        rows.push(PlayRow {
            play_id: ids.next_id(),
            start_time: time.epoch_millis(),
            event,
            matched,
            year: time.year,
            month: time.month,
        });
    }

    debug!(
        "Joined {} events to {} catalog titles: {} matched, {} unmatched",
        events.len(),
        catalog.len(),
        rows.len(),
        unmatched
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.play_id))),
        Arc::new(
            TimestampMillisecondArray::from_iter_values(rows.iter().map(|r| r.start_time))
                .with_timezone("UTC"),
        ),
        utf8(rows.iter().map(|r| r.event.user_id.as_deref())),
        utf8(rows.iter().map(|r| r.event.subscription_level.as_deref())),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.matched.catalog_id.as_str()),
        )),
        utf8(rows.iter().map(|r| r.matched.creator_id.as_deref())),
        Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.event.session_id))),
        utf8(rows.iter().map(|r| r.event.location.as_deref())),
        utf8(rows.iter().map(|r| r.event.user_agent.as_deref())),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.month))),
    ];

    let batch = RecordBatch::try_new(play_fact_schema(), columns)?;
    info!("Built {} play rows ({} events unmatched)", batch.num_rows(), unmatched);

    Ok(JoinOutcome { batch, unmatched })
}
