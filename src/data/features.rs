use chrono::{DateTime, NaiveDateTime};

use super::records::RawEvent;
use crate::error::{PipelineErr, Result};

/// The positive implicit-feedback signal. Every other event type is
/// discarded; no negative labels are synthesized.
pub const VIEW_EVENT: &str = "view";

/// Keeps only "view" events. Idempotent: a second pass over the result is
/// a no-op.
pub fn filter_views(events: Vec<RawEvent>) -> Vec<RawEvent> {
    events
        .into_iter()
        .filter(|event| event.event_type == VIEW_EVENT)
        .collect()
}

/// Converts an event time to seconds since the Unix epoch.
///
/// The raw log carries times either as `YYYY-MM-DD HH:MM:SS[.frac] UTC`,
/// as RFC 3339, or already as a numeric epoch value. The result is used
/// directly as the interaction-strength label: recency of viewing stands
/// in for relevance, and that conflation is kept as-is.
///
/// # Errors
/// `BadTimestamp` if the value parses as none of the accepted forms.
pub fn event_time_seconds(value: &str) -> Result<f64> {
    if let Ok(seconds) = value.parse::<f64>() {
        return Ok(seconds);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(epoch_seconds(dt.timestamp(), dt.timestamp_subsec_nanos()));
    }

    let naive = value.strip_suffix(" UTC").unwrap_or(value);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
        .map(|dt| {
            let utc = dt.and_utc();
            epoch_seconds(utc.timestamp(), utc.timestamp_subsec_nanos())
        })
        .map_err(|_| PipelineErr::BadTimestamp {
            value: value.to_string(),
        })
}

fn epoch_seconds(secs: i64, subsec_nanos: u32) -> f64 {
    secs as f64 + f64::from(subsec_nanos) * 1e-9
}
