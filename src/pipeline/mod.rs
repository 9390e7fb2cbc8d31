//! Pipeline module
//!
//! Runs the two flows that build the star schema.
//!
//! # Overview
//!
//! - The catalog flow lists and reads catalog objects, then commits `songs`
//!   and `artists`.
//! - The event flow lists and reads event objects, keeps the play events,
//!   commits `users` and `time`, then reads `songs` back to join the plays
//!   into `songplays`.
//!
//! [`Pipeline::run`] runs both flows concurrently. The only ordering point is
//! the join: it starts once the catalog flow has committed `songs`.

mod types;

pub use types::{FlowStats, RunSummary};

use crate::config::PipelineConfig;
use crate::decode::{CatalogRecord, EventRecord, RecordReader};
use crate::error::{Error, Result};
use crate::listing::{ObjectLister, ObjectLocator};
use crate::output::PartitionedWriter;
use crate::storage::ObjectSource;
use crate::transform::{
    build_catalog_dim, build_creator_dim, build_time_dim, build_user_dim, catalog_dim_schema,
    dedup_by_key, filter_events, is_play_event, join_events_to_catalog, CatalogIndex,
    PlayIdGenerator,
};
use crate::types::{tables, DatasetKind};
use std::time::Instant;
use tracing::{debug, info};

/// Event flow state between the dimension writes and the join
struct StagedEvents {
    plays: Vec<EventRecord>,
    stats: FlowStats,
    start: Instant,
}

/// The extraction pipeline
pub struct Pipeline {
    config: PipelineConfig,
    catalog: ObjectSource,
    events: ObjectSource,
    writer: PartitionedWriter,
}

impl Pipeline {
    /// Create a pipeline from a config, connecting to every store it names
    ///
    /// Sources with identical URLs share one store handle.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let catalog = ObjectSource::parse(&config.catalog.url)?;
        let events = if config.events.url == config.catalog.url {
            catalog.clone()
        } else {
            ObjectSource::parse(&config.events.url)?
        };
        let writer = PartitionedWriter::parse(&config.output.url)?
            .with_parquet_config(config.parquet.writer_config());

        Ok(Self::from_parts(config, catalog, events, writer))
    }

    /// Create a pipeline over already-built sources and destination
    ///
    /// The source and output URLs in `config` are ignored.
    pub fn from_parts(
        config: PipelineConfig,
        catalog: ObjectSource,
        events: ObjectSource,
        writer: PartitionedWriter,
    ) -> Self {
        Self {
            config,
            catalog,
            events,
            writer,
        }
    }

    /// Get the config
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the output writer
    pub fn writer(&self) -> &PartitionedWriter {
        &self.writer
    }

    fn source(&self, dataset: DatasetKind) -> (&ObjectSource, &str) {
        match dataset {
            DatasetKind::Catalog => (&self.catalog, &self.config.catalog.prefix),
            DatasetKind::Events => (&self.events, &self.config.events.prefix),
        }
    }

    fn lister(&self, dataset: DatasetKind) -> ObjectLister<'_> {
        let (source, prefix) = self.source(dataset);
        ObjectLister::new(source, prefix)
            .with_suffix(&self.config.listing.suffix)
            .with_page_size(self.config.listing.page_size)
    }

    fn reader(&self, dataset: DatasetKind) -> RecordReader<'_> {
        let (source, _) = self.source(dataset);
        RecordReader::new(source)
            .with_policy(self.config.reader.malformed_records)
            .with_concurrency(self.config.reader.concurrency)
    }

    /// List every source object of a dataset
    pub async fn list(&self, dataset: DatasetKind) -> Result<Vec<ObjectLocator>> {
        let locators = self.lister(dataset).collect().await?;
        info!("Found {} {} objects", locators.len(), dataset);
        Ok(locators)
    }

    /// Run both flows, joining plays once `songs` is committed
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        info!(
            "Starting run: {} + {} -> {}",
            self.catalog.url_for(&self.catalog.key(&self.config.catalog.prefix)),
            self.events.url_for(&self.events.key(&self.config.events.prefix)),
            self.writer.root().url_for(self.writer.root().base())
        );

        let (catalog, staged) =
            tokio::try_join!(self.run_catalog_flow(), self.stage_event_flow())?;
        let events = self.finish_event_flow(staged).await?;

        let summary = RunSummary {
            catalog,
            events,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Run finished in {} ms: {} tables committed",
            summary.duration_ms,
            summary.tables().count()
        );

        Ok(summary)
    }

    /// Build and commit `songs` and `artists`
    pub async fn run_catalog_flow(&self) -> Result<FlowStats> {
        let start = Instant::now();
        let mut stats = FlowStats::new(DatasetKind::Catalog);

        let lister = self.lister(DatasetKind::Catalog);
        let outcome = self
            .reader(DatasetKind::Catalog)
            .read_catalog(lister.locators())
            .await?;
        stats.add_read(&outcome);

        let records = dedup_by_key(outcome.records, |r| r.catalog_id.clone());
        if records.len() < stats.records_read {
            debug!(
                "Dropped {} catalog records with a repeated catalog_id",
                stats.records_read - records.len()
            );
        }
        stats.records_kept = records.len();

        let catalog = CatalogRecord::to_batch(&records)?;
        let songs = build_catalog_dim(&catalog)?;
        let artists = build_creator_dim(&catalog)?;

        stats.add_table(
            self.writer
                .write_table(tables::SONGS, &songs, tables::SONGS_PARTITIONS)
                .await?,
        );
        stats.add_table(self.writer.write_table(tables::ARTISTS, &artists, &[]).await?);

        stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Catalog flow finished: {} records, {} songs, {} artists",
            stats.records_kept,
            songs.num_rows(),
            artists.num_rows()
        );

        Ok(stats)
    }

    /// Build and commit `users`, `time` and `songplays`
    ///
    /// Needs a committed `songs` table from an earlier catalog flow.
    pub async fn run_event_flow(&self) -> Result<FlowStats> {
        if !self.writer.is_committed(tables::SONGS).await? {
            return Err(Error::TableNotCommitted {
                table: tables::SONGS.to_string(),
            });
        }

        let staged = self.stage_event_flow().await?;
        self.finish_event_flow(staged).await
    }

    async fn stage_event_flow(&self) -> Result<StagedEvents> {
        let start = Instant::now();
        let mut stats = FlowStats::new(DatasetKind::Events);

        let lister = self.lister(DatasetKind::Events);
        let outcome = self
            .reader(DatasetKind::Events)
            .read_events(lister.locators())
            .await?;
        stats.add_read(&outcome);

        let plays = filter_events(outcome.records, is_play_event);
        stats.records_kept = plays.len();
        debug!(
            "Kept {} play events of {} events",
            plays.len(),
            stats.records_read
        );

        let users = build_user_dim(&EventRecord::to_batch(&plays)?)?;
        let time = build_time_dim(&plays)?;

        stats.add_table(self.writer.write_table(tables::USERS, &users, &[]).await?);
        stats.add_table(
            self.writer
                .write_table(tables::TIME, &time, tables::TIME_PARTITIONS)
                .await?,
        );

        Ok(StagedEvents {
            plays,
            stats,
            start,
        })
    }

    async fn finish_event_flow(&self, staged: StagedEvents) -> Result<FlowStats> {
        let StagedEvents {
            plays,
            mut stats,
            start,
        } = staged;

        let songs = self
            .writer
            .read_table(tables::SONGS, &catalog_dim_schema())
            .await?;
        let index = CatalogIndex::from_batches(&songs)?;
        debug!("Indexed {} catalog titles", index.len());

        let ids = PlayIdGenerator::new();
        let joined = join_events_to_catalog(&plays, &index, &ids)?;
        stats.unmatched_plays = joined.unmatched;

        stats.add_table(
            self.writer
                .write_table(tables::SONGPLAYS, &joined.batch, tables::SONGPLAYS_PARTITIONS)
                .await?,
        );

        stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Event flow finished: {} plays, {} joined, {} unmatched",
            stats.records_kept,
            joined.batch.num_rows(),
            stats.unmatched_plays
        );

        Ok(stats)
    }
}
