//! Output module
//!
//! Writes the analytics tables as Hive-partitioned Parquet and reads them
//! back.
//!
//! # Layout
//!
//! ```text
//! <output>/songs/year=2018/creator_id=AR5KOSW1187FB35FF4/part-00000.parquet
//! <output>/songs/_SUCCESS
//! <output>/time/year=2018/month=11/part-00003.parquet
//! ```

mod partition;
mod table;
mod writer;

pub use partition::{
    escape_partition_value, parse_partition_segment, partition_dir, split_partitions,
    unescape_partition_value, PartitionSlice, PartitionValue, DEFAULT_PARTITION,
};
pub use table::{PartitionedWriter, TableWriteSummary, STAGING_DIR, SUCCESS_MARKER};
pub use writer::{decode_parquet, encode_parquet, ParquetWriterConfig};
