//! Health evaluation of a channel's derived statistics.
//!
//! A fixed decision table, checked in order with the first match winning:
//!
//! 1. corrupted: no latest reading, latest reading stale, latest value or
//!    rolling average not a number, or rolling average exactly zero;
//! 2. anomaly: latest / rolling average strictly above the ratio threshold;
//! 3. healthy.
//!
//! The corruption rules make the ratio in step 2 always well defined.

use chrono::{DateTime, Utc};

use super::stalenesses::{is_stale_at, StalenessPolicy};
use super::thresholds::{exceeds_ratio, AnomalyPolicy};
use crate::model::{DerivedStats, Verdict};

/// Renders the corruption warning for `channel` detected at `now`.
pub fn corrupted_message(channel: &str, now: DateTime<Utc>) -> String {
    format!(
        "There was a problem with updating PM values of {} at {}",
        channel,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Renders the anomaly warning for `channel`.
pub fn anomaly_message(channel: &str) -> String {
    format!("Latest levels of {} are significantly higher that 24h avg...", channel)
}

/// Returns `true` if `stats` cannot be trusted as a current observation.
pub fn is_corrupted_at(
    stats: &DerivedStats,
    staleness: &StalenessPolicy,
    now: DateTime<Utc>,
) -> bool {
    let Some(latest) = stats.latest_timestamp else {
        return true;
    };
    is_stale_at(&latest, staleness, now)
        || stats.latest_value.is_nan()
        || stats.rolling_average.is_nan()
        || stats.rolling_average == 0.0
}

/// Evaluates `stats` at `now`.
pub fn evaluate_at(
    stats: &DerivedStats,
    staleness: &StalenessPolicy,
    anomaly: &AnomalyPolicy,
    now: DateTime<Utc>,
) -> Verdict {
    if is_corrupted_at(stats, staleness, now) {
        return Verdict::Corrupted {
            message: corrupted_message(&stats.channel_name, now),
        };
    }
    if exceeds_ratio(stats.latest_value, stats.rolling_average, anomaly) {
        return Verdict::Anomaly {
            message: anomaly_message(&stats.channel_name),
        };
    }
    Verdict::Healthy
}

/// Convenience wrapper that uses the real current time.
pub fn evaluate(
    stats: &DerivedStats,
    staleness: &StalenessPolicy,
    anomaly: &AnomalyPolicy,
) -> Verdict {
    evaluate_at(stats, staleness, anomaly, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
