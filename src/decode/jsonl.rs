//! Newline-delimited JSON decoding into typed rows

use crate::error::{Error, Result};
use crate::types::MalformedRecordPolicy;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Rows decoded from one object
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedObject<T> {
    /// Records in line order
    pub records: Vec<T>,
    /// Lines dropped under [`MalformedRecordPolicy::Skip`]
    pub skipped: usize,
}

/// Decode one object body, one record per non-blank line
///
/// `location` is only used in errors and logs. Line numbers are 1-based.
pub fn decode_lines<T: DeserializeOwned>(
    body: &[u8],
    location: &str,
    policy: MalformedRecordPolicy,
) -> Result<DecodedObject<T>> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for (line_num, line) in body.split(|b| *b == b'\n').enumerate() {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => match policy {
                MalformedRecordPolicy::Abort => {
                    return Err(Error::parse(location, line_num + 1, e.to_string()));
                }
                MalformedRecordPolicy::Skip => {
                    warn!(
                        "Skipping malformed record in {} at line {}: {}",
                        location,
                        line_num + 1,
                        e
                    );
                    skipped += 1;
                }
            },
        }
    }

    Ok(DecodedObject { records, skipped })
}
