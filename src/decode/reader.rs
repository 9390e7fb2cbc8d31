//! Reads listed objects into typed row sets

use super::jsonl::{decode_lines, DecodedObject};
use super::records::{CatalogRecord, EventRecord};
use crate::error::{Error, Result};
use crate::listing::ObjectLocator;
use crate::storage::ObjectSource;
use crate::types::{DatasetKind, MalformedRecordPolicy};
use futures::{pin_mut, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// All rows read for one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome<T> {
    /// Records in listing order, then line order
    pub records: Vec<T>,
    /// Objects read
    pub objects: usize,
    /// Malformed lines skipped
    pub skipped_lines: usize,
}

impl<T> Default for ReadOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            objects: 0,
            skipped_lines: 0,
        }
    }
}

impl<T> ReadOutcome<T> {
    fn absorb(&mut self, decoded: DecodedObject<T>) {
        self.records.extend(decoded.records);
        self.skipped_lines += decoded.skipped;
        self.objects += 1;
    }
}

/// Fetches objects from one bucket and decodes them
///
/// Up to `concurrency` objects are fetched at once; results are consumed in
/// listing order so the output order only depends on the listing.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    source: &'a ObjectSource,
    policy: MalformedRecordPolicy,
    concurrency: usize,
}

impl<'a> RecordReader<'a> {
    /// Create a reader that aborts on malformed lines
    pub fn new(source: &'a ObjectSource) -> Self {
        Self {
            source,
            policy: MalformedRecordPolicy::default(),
            concurrency: 8,
        }
    }

    /// Set the malformed record policy
    #[must_use]
    pub fn with_policy(mut self, policy: MalformedRecordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set how many objects are fetched concurrently
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Read catalog objects
    pub async fn read_catalog<S>(&self, locators: S) -> Result<ReadOutcome<CatalogRecord>>
    where
        S: Stream<Item = Result<ObjectLocator>> + Send,
    {
        self.read(DatasetKind::Catalog, locators).await
    }

    /// Read event objects
    pub async fn read_events<S>(&self, locators: S) -> Result<ReadOutcome<EventRecord>>
    where
        S: Stream<Item = Result<ObjectLocator>> + Send,
    {
        self.read(DatasetKind::Events, locators).await
    }

    /// Read every listed object into rows of type `T`
    pub async fn read<T, S>(&self, kind: DatasetKind, locators: S) -> Result<ReadOutcome<T>>
    where
        T: DeserializeOwned + Send,
        S: Stream<Item = Result<ObjectLocator>> + Send,
    {
        let policy = self.policy;
        let decoded = locators
            .map_ok(|locator| self.read_object::<T>(locator, policy))
            .try_buffered(self.concurrency);
        pin_mut!(decoded);

        let mut outcome = ReadOutcome::default();
        while let Some(object) = decoded.try_next().await? {
            outcome.absorb(object);
        }

        info!(
            "Read {} {} records from {} objects ({} malformed lines skipped)",
            outcome.records.len(),
            kind,
            outcome.objects,
            outcome.skipped_lines
        );

        Ok(outcome)
    }

    async fn read_object<T: DeserializeOwned>(
        &self,
        locator: ObjectLocator,
        policy: MalformedRecordPolicy,
    ) -> Result<DecodedObject<T>> {
        if locator.bucket != self.source.bucket() {
            return Err(Error::retrieval(
                locator.to_string(),
                format!("object is not in bucket '{}'", self.source.bucket()),
            ));
        }

        let body = self.source.get(&locator.key).await?;
        debug!("Fetched {} ({} bytes)", locator, body.len());

        decode_lines(&body, &locator.to_string(), policy)
    }
}
