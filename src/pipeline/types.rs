//! Pipeline types
//!
//! Statistics reported by each flow and by a full run.

use crate::decode::ReadOutcome;
use crate::output::TableWriteSummary;
use crate::types::DatasetKind;
use serde::Serialize;

/// Statistics from one flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowStats {
    /// Dataset the flow read
    pub dataset: DatasetKind,
    /// Objects read
    pub objects_read: usize,
    /// Records decoded
    pub records_read: usize,
    /// Malformed lines skipped
    pub skipped_lines: usize,
    /// Records left after filtering and deduplication
    pub records_kept: usize,
    /// Play events without a catalog match (event flow only)
    pub unmatched_plays: usize,
    /// Tables committed, in commit order
    pub tables: Vec<TableWriteSummary>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl FlowStats {
    /// Create empty stats for a dataset
    pub fn new(dataset: DatasetKind) -> Self {
        Self {
            dataset,
            objects_read: 0,
            records_read: 0,
            skipped_lines: 0,
            records_kept: 0,
            unmatched_plays: 0,
            tables: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Record what a reader returned
    pub fn add_read<T>(&mut self, outcome: &ReadOutcome<T>) {
        self.objects_read += outcome.objects;
        self.records_read += outcome.records.len();
        self.skipped_lines += outcome.skipped_lines;
    }

    /// Record a committed table
    pub fn add_table(&mut self, summary: TableWriteSummary) {
        self.tables.push(summary);
    }

    /// Rows written to `table` by this flow
    pub fn rows_written(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Statistics from a full run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Catalog flow
    pub catalog: FlowStats,
    /// Event flow
    pub events: FlowStats,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Every committed table of the run
    pub fn tables(&self) -> impl Iterator<Item = &TableWriteSummary> {
        self.catalog.tables.iter().chain(&self.events.tables)
    }
}
