//! Staleness detection for a channel's latest observation.
//!
//! Sensor APIs publish roughly hourly. A latest observation that stops
//! advancing usually means a sensor outage or a stuck upstream feed, which
//! the dashboard will not make obvious. This module answers "is the newest
//! reading too old?".
//!
//! # Clock injection
//! All functions accept a `now: DateTime<Utc>` parameter rather than calling
//! `Utc::now()` internally, which keeps staleness deterministic in tests.

use chrono::{DateTime, FixedOffset, Utc};

/// Maximum tolerated age of the latest observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StalenessPolicy {
    pub max_age_minutes: f64,
}

/// Age of `timestamp` relative to `now`, in fractional minutes. Negative for
/// timestamps in the future.
pub fn age_minutes(timestamp: &DateTime<FixedOffset>, now: DateTime<Utc>) -> f64 {
    let age = now.signed_duration_since(timestamp.with_timezone(&Utc));
    age.num_milliseconds() as f64 / 60_000.0
}

/// Returns `true` if `timestamp` is at least `max_age_minutes` old:
///   age >= max_age_minutes  →  stale
///
/// Timestamps in the future are never stale.
pub fn is_stale_at(
    timestamp: &DateTime<FixedOffset>,
    policy: &StalenessPolicy,
    now: DateTime<Utc>,
) -> bool {
    age_minutes(timestamp, now) >= policy.max_age_minutes
}

/// Convenience wrapper that uses the real current time.
/// Use `is_stale_at` in tests to keep them deterministic.
pub fn is_stale(timestamp: &DateTime<FixedOffset>, policy: &StalenessPolicy) -> bool {
    is_stale_at(timestamp, policy, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
