use serde::{Deserialize, Serialize};

use crate::error::{PipelineErr, Result};

/// One row of the raw interaction log. Source of truth; immutable once
/// loaded.
///
/// The event-type domain is open (`view`, `cart`, `purchase`, ...);
/// identifiers and times stay in their raw textual form until the feature
/// and encoding passes rewrite them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub user_id: String,
    pub product_id: String,
    pub event_type: String,
    pub event_time: String,
}

/// One encoded row of a train/test split: dense indices plus the derived
/// interaction-strength label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: u32,
    pub product_id: u32,
    pub interaction_strength: f64,
}

const RAW_COLUMNS: [&str; 4] = ["user_id", "product_id", "event_type", "event_time"];

/// Decodes the raw interaction log from a CSV blob.
///
/// Extra columns are ignored; a missing required column fails before any
/// row is read.
///
/// # Errors
/// `MissingColumn` if the header lacks a required column, `Csv` on any
/// malformed row.
pub fn read_raw_events(bytes: &[u8]) -> Result<Vec<RawEvent>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers()?.clone();
    for column in RAW_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PipelineErr::MissingColumn { column });
        }
    }

    reader
        .deserialize()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

/// Decodes an encoded split from a CSV blob.
pub fn read_interactions(bytes: &[u8]) -> Result<Vec<Interaction>> {
    csv::Reader::from_reader(bytes)
        .deserialize()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

/// Encodes a split as a CSV blob with a header row.
pub fn write_interactions(records: &[Interaction]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineErr::Artifact(format!("csv buffer: {e}")))
}
