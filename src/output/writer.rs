//! Parquet encoding
//!
//! Each partition slice becomes one complete Parquet file built in memory
//! and uploaded with a single put.

use crate::config::CompressionCodec;
use crate::error::Result;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};

/// How table files are encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParquetWriterConfig {
    codec: CompressionCodec,
    row_group_size: usize,
    dictionary_enabled: bool,
    statistics_enabled: bool,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self::new(CompressionCodec::default(), 1024 * 1024)
    }
}

impl ParquetWriterConfig {
    /// Create a config with dictionary encoding and statistics enabled
    pub fn new(codec: CompressionCodec, row_group_size: usize) -> Self {
        Self {
            codec,
            row_group_size: row_group_size.max(1),
            dictionary_enabled: true,
            statistics_enabled: true,
        }
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    /// Enable or disable column statistics
    #[must_use]
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    pub fn codec(&self) -> CompressionCodec {
        self.codec
    }

    /// Maximum rows per row group
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn compression(&self) -> Compression {
        match self.codec {
            CompressionCodec::Uncompressed => Compression::UNCOMPRESSED,
            CompressionCodec::Snappy => Compression::SNAPPY,
            CompressionCodec::Zstd => Compression::ZSTD(ZstdLevel::default()),
            CompressionCodec::Gzip => Compression::GZIP(GzipLevel::default()),
        }
    }

    fn properties(&self) -> WriterProperties {
        let statistics = if self.statistics_enabled {
            EnabledStatistics::Page
        } else {
            EnabledStatistics::None
        };

        WriterProperties::builder()
            .set_compression(self.compression())
            .set_max_row_group_size(self.row_group_size)
            .set_dictionary_enabled(self.dictionary_enabled)
            .set_statistics_enabled(statistics)
            .build()
    }
}

/// Encode a batch as one Parquet file
pub fn encode_parquet(batch: &RecordBatch, config: &ParquetWriterConfig) -> Result<Bytes> {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(config.properties()))?;

    writer.write(batch)?;
    writer.close()?;

    Ok(Bytes::from(buf))
}

/// Decode every batch of a Parquet file
pub fn decode_parquet(data: Bytes) -> Result<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)?.build()?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}
