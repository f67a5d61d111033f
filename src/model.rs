//! Core data types for the air-quality monitoring service.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no logic beyond construction helpers and no I/O: readings,
//! per-channel series, the derived statistics snapshot, the evaluation
//! verdict, and the error taxonomy of the pipeline's I/O boundaries.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single sensor observation.
///
/// `raw_value` is kept exactly as received. `None` or an empty string means
/// the source reported the timestamp without a measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<FixedOffset>, // keeps the source's UTC offset
    pub raw_value: Option<String>,
}

impl Reading {
    pub fn new(timestamp: DateTime<FixedOffset>, raw_value: Option<&str>) -> Self {
        Self {
            timestamp,
            raw_value: raw_value.map(String::from),
        }
    }

    /// The numeric value, or NaN when the raw value is absent, empty,
    /// unparsable or not finite. NaN is an expected state, not an error.
    pub fn value(&self) -> f64 {
        self.raw_value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(f64::NAN)
    }

    pub fn has_value(&self) -> bool {
        !self.value().is_nan()
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// All readings of one measurement channel, keyed by timestamp.
///
/// Timestamps are unique by construction. Two timestamps with different UTC
/// offsets denoting the same instant are the same key. Persisted as a JSON
/// blob with readings listed newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SeriesBlob", into = "SeriesBlob")]
pub struct Series {
    pub channel_name: String,
    readings: BTreeMap<DateTime<FixedOffset>, Reading>,
}

impl Series {
    pub fn empty(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            readings: BTreeMap::new(),
        }
    }

    /// Builds a series from readings in any order. When a timestamp repeats,
    /// the last occurrence wins.
    pub fn from_readings(
        channel_name: impl Into<String>,
        readings: impl IntoIterator<Item = Reading>,
    ) -> Self {
        let mut series = Self::empty(channel_name);
        for reading in readings {
            series.insert(reading);
        }
        series
    }

    /// Inserts a reading, replacing any reading at the same timestamp.
    pub fn insert(&mut self, reading: Reading) -> Option<Reading> {
        self.readings.insert(reading.timestamp, reading)
    }

    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        self.readings.contains_key(timestamp)
    }

    pub fn get(&self, timestamp: &DateTime<FixedOffset>) -> Option<&Reading> {
        self.readings.get(timestamp)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings ordered newest first.
    pub fn by_recency(&self) -> impl Iterator<Item = &Reading> {
        self.readings.values().rev()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.by_recency().next()
    }

    pub(crate) fn into_readings(self) -> impl Iterator<Item = Reading> {
        self.readings.into_values()
    }
}

/// On-disk shape of a `Series`.
#[derive(Serialize, Deserialize)]
struct SeriesBlob {
    channel_name: String,
    readings: Vec<Reading>,
}

impl From<SeriesBlob> for Series {
    fn from(blob: SeriesBlob) -> Self {
        Series::from_readings(blob.channel_name, blob.readings)
    }
}

impl From<Series> for SeriesBlob {
    fn from(series: Series) -> Self {
        let channel_name = series.channel_name.clone();
        let mut readings: Vec<Reading> = series.into_readings().collect();
        readings.reverse();
        SeriesBlob {
            channel_name,
            readings,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation types
// ---------------------------------------------------------------------------

/// Summary of a series at evaluation time. A detached snapshot: it holds no
/// reference to the series that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedStats {
    pub channel_name: String,
    pub latest_timestamp: Option<DateTime<FixedOffset>>,
    pub latest_value: f64,    // NaN if absent or unparsable
    pub rolling_average: f64, // NaN if any reading in the window lacks a value
}

/// Outcome of evaluating a channel's derived statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    /// Latest observation missing, stale, or numerically invalid.
    Corrupted { message: String },
    /// Latest observation far above the rolling average.
    Anomaly { message: String },
}

impl Verdict {
    pub fn message(&self) -> Option<&str> {
        match self {
            Verdict::Healthy => None,
            Verdict::Corrupted { message } | Verdict::Anomaly { message } => Some(message),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Healthy => "healthy",
            Verdict::Corrupted { .. } => "corrupted",
            Verdict::Anomaly { .. } => "anomaly",
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while retrieving a batch from the remote source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The source could not be reached (DNS, connect, timeout, I/O).
    #[error("Source unreachable: {0}")]
    Unreachable(String),
    /// Non-2xx HTTP response.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The payload could not be decoded into readings.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors raised by series or warning storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt blob for {key}: {message}")]
    Corrupt { key: String, message: String },
    #[error("Database error: {0}")]
    Database(#[from] postgres::Error),
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while delivering a warning. Never fatal to a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook error: {0}")]
    Webhook(String),
    #[error("Multiple notification failures: {0:?}")]
    Multiple(Vec<NotifyError>),
}

/// Failure of one channel's pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("storage failed: {0}")]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
