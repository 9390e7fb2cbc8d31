//! Record decoding module
//!
//! # Overview
//!
//! Turns listed objects into typed rows. Each object holds newline-delimited
//! JSON; every non-blank line is one record. The row schema is fixed per
//! dataset kind: [`CatalogRecord`] for catalog objects, [`EventRecord`] for
//! event objects.

mod jsonl;
mod reader;
mod records;

pub use jsonl::{decode_lines, DecodedObject};
pub use reader::{ReadOutcome, RecordReader};
pub use records::{CatalogRecord, EventRecord, PLAY_EVENT};

#[cfg(test)]
mod tests;
