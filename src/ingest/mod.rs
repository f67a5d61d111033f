//! Retrieval of raw sensor batches.
//!
//! A `Fetcher` turns a channel's source address into a `Series`. Both
//! implementations decode the same JSON payload shape:
//!
//! ```json
//! { "key": "PM10",
//!   "values": [ { "date": "2024-05-01 13:00:00", "value": 41.2 },
//!               { "date": "2024-05-01 12:00:00", "value": null } ] }
//! ```
//!
//! `date` is RFC 3339, or a naive local time interpreted at the configured
//! UTC offset. `value` may be a number, a string, or null. An absent or empty
//! `values` array is an empty batch, not an error.

pub mod file;
pub mod http;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::Deserialize;

use crate::channels::Channel;
use crate::model::{FetchError, Reading, Series};

pub use file::FileFetcher;
pub use http::HttpFetcher;

/// Source of raw batches for a channel.
pub trait Fetcher: Send + Sync {
    /// Fetches the channel's current batch. Returns an empty series when the
    /// source has no data; fails only when the source is unreachable or the
    /// payload is malformed.
    fn fetch(&self, channel: &Channel) -> Result<Series, FetchError>;
}

// ============================================================================
// Payload structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SensorPayload {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<SensorValue>>,
}

#[derive(Debug, Deserialize)]
pub struct SensorValue {
    pub date: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

// ============================================================================
// Decoding
// ============================================================================

/// Parses a source timestamp. Zone-less values are placed at `offset`.
pub fn parse_timestamp(
    raw: &str,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, FetchError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .ok_or_else(|| FetchError::Parse(format!("unrecognised timestamp '{}'", raw)))
}

/// Raw value as received. Numbers keep their JSON spelling; null is absent.
fn raw_value(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Decodes a payload body into a series named after `channel_name`.
pub fn parse_payload(
    channel_name: &str,
    body: &str,
    offset: FixedOffset,
) -> Result<Series, FetchError> {
    let payload: SensorPayload =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let mut readings = Vec::new();
    for entry in payload.values.unwrap_or_default() {
        let timestamp = parse_timestamp(&entry.date, offset)?;
        readings.push(Reading {
            timestamp,
            raw_value: raw_value(entry.value),
        });
    }
    Ok(Series::from_readings(channel_name, readings))
}

/// Converts whole hours to a `FixedOffset`, rejecting out-of-range values.
pub fn offset_from_hours(hours: i32) -> Result<FixedOffset, FetchError> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| FetchError::Parse(format!("invalid UTC offset {} hours", hours)))
}

// ============================================================================
// Tests
// ============================================================================
