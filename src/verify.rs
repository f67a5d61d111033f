//! Source Verification Module
//!
//! Fetches every configured channel once and reports which sources are
//! reachable and returning usable data. Nothing is merged or stored.
//!
//! Use this before adding new channels to the configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::stalenesses::{age_minutes, StalenessPolicy};
use crate::channels::Channel;
use crate::ingest::Fetcher;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub channels: Vec<ChannelVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

impl VerificationSummary {
    /// Percentage of channels that responded with data; 0 when none are configured.
    pub fn success_rate(&self) -> f64 {
        if self.total > 0 {
            (self.working as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelVerification {
    pub name: String,
    pub source: String,
    pub status: VerificationStatus,
    pub responded: bool,
    pub reading_count: usize,
    pub parsable_count: usize,
    /// Age of the newest reading in minutes, if any reading came back.
    pub newest_age_minutes: Option<f64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    /// Responded, but no parsable values or only stale ones.
    PartialSuccess,
    Failed,
}

// ============================================================================
// Channel Verification
// ============================================================================

pub fn verify_channel_at(
    fetcher: &dyn Fetcher,
    channel: &Channel,
    staleness: &StalenessPolicy,
    now: DateTime<Utc>,
) -> ChannelVerification {
    let mut result = ChannelVerification {
        name: channel.name.clone(),
        source: channel.source.clone(),
        status: VerificationStatus::Failed,
        responded: false,
        reading_count: 0,
        parsable_count: 0,
        newest_age_minutes: None,
        error_message: None,
    };

    let series = match fetcher.fetch(channel) {
        Ok(series) => series,
        Err(e) => {
            result.error_message = Some(e.to_string());
            return result;
        }
    };

    result.responded = true;
    result.reading_count = series.len();
    result.parsable_count = series.by_recency().filter(|r| r.has_value()).count();
    result.newest_age_minutes = series.latest().map(|r| age_minutes(&r.timestamp, now));

    let fresh = result
        .newest_age_minutes
        .is_some_and(|age| age < staleness.max_age_minutes);
    result.status = if result.parsable_count > 0 && fresh {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };

    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_verification_at(
    fetcher: &dyn Fetcher,
    channels: &[Channel],
    staleness: &StalenessPolicy,
    now: DateTime<Utc>,
) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: now.to_rfc3339(),
        channels: Vec::new(),
        summary: VerificationSummary {
            total: channels.len(),
            ..Default::default()
        },
    };

    for channel in channels {
        let result = verify_channel_at(fetcher, channel, staleness, now);
        match result.status {
            VerificationStatus::Success | VerificationStatus::PartialSuccess => {
                report.summary.working += 1
            }
            VerificationStatus::Failed => report.summary.failed += 1,
        }
        report.channels.push(result);
    }

    report
}

pub fn run_verification(
    fetcher: &dyn Fetcher,
    channels: &[Channel],
    staleness: &StalenessPolicy,
) -> VerificationReport {
    run_verification_at(fetcher, channels, staleness, Utc::now())
}

pub fn print_summary(report: &VerificationReport) {
    println!("═══════════════════════════════════════════════════════════");
    println!("SOURCE VERIFICATION ({})", report.timestamp);
    println!("═══════════════════════════════════════════════════════════");

    for result in &report.channels {
        match result.status {
            VerificationStatus::Success => println!(
                "  {:<12} ✓ OK ({}/{} parsable, newest {:.0} min old)",
                result.name,
                result.parsable_count,
                result.reading_count,
                result.newest_age_minutes.unwrap_or_default()
            ),
            VerificationStatus::PartialSuccess => match result.newest_age_minutes {
                Some(age) => println!(
                    "  {:<12} ⚠ Partial ({}/{} parsable, newest {:.0} min old)",
                    result.name, result.parsable_count, result.reading_count, age
                ),
                None => println!("  {:<12} ⚠ Responsive but no data", result.name),
            },
            VerificationStatus::Failed => println!(
                "  {:<12} ✗ FAILED: {}",
                result.name,
                result.error_message.as_deref().unwrap_or("Unknown")
            ),
        }
    }

    println!();
    println!(
        "Channels:    {}/{} working  ({} failed)",
        report.summary.working, report.summary.total, report.summary.failed
    );
    println!(
        "Overall Success Rate: {:.1}% ({}/{})",
        report.summary.success_rate(),
        report.summary.working,
        report.summary.total
    );
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FetchError, Reading, Series};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    /// Serves fixed readings for "PM10", a stale one for "OLD", nothing for
    /// "EMPTY" and a 404 for everything else.
    struct StubFetcher;

    impl Fetcher for StubFetcher {
        fn fetch(&self, channel: &Channel) -> Result<Series, FetchError> {
            let at = |minutes: i64| (now() - Duration::minutes(minutes)).fixed_offset();
            match channel.name.as_str() {
                "PM10" => Ok(Series::from_readings(
                    "PM10",
                    vec![Reading::new(at(10), Some("12.0")), Reading::new(at(70), None)],
                )),
                "OLD" => Ok(Series::from_readings("OLD", vec![Reading::new(at(600), Some("5"))])),
                "EMPTY" => Ok(Series::empty("EMPTY")),
                _ => Err(FetchError::Http(404)),
            }
        }
    }

    fn policy() -> StalenessPolicy {
        StalenessPolicy {
            max_age_minutes: 90.0,
        }
    }

    #[test]
    fn test_fresh_channel_verifies() {
        let result = verify_channel_at(&StubFetcher, &Channel::new("PM10", "92"), &policy(), now());
        assert_eq!(result.status, VerificationStatus::Success);
        assert_eq!(result.reading_count, 2);
        assert_eq!(result.parsable_count, 1, "null value should not count as parsable");
        assert_eq!(result.newest_age_minutes, Some(10.0));
    }

    #[test]
    fn test_stale_or_empty_channel_is_partial() {
        let stale = verify_channel_at(&StubFetcher, &Channel::new("OLD", "1"), &policy(), now());
        assert_eq!(stale.status, VerificationStatus::PartialSuccess);

        let empty = verify_channel_at(&StubFetcher, &Channel::new("EMPTY", "2"), &policy(), now());
        assert_eq!(empty.status, VerificationStatus::PartialSuccess);
        assert_eq!(empty.newest_age_minutes, None);
    }

    #[test]
    fn test_unreachable_channel_fails_with_message() {
        let result = verify_channel_at(&StubFetcher, &Channel::new("NO2", "3"), &policy(), now());
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(!result.responded);
        assert!(result.error_message.unwrap().contains("404"));
    }

    #[test]
    fn test_report_summary_counts() {
        let channels = vec![
            Channel::new("PM10", "92"),
            Channel::new("EMPTY", "2"),
            Channel::new("NO2", "3"),
        ];
        let report = run_verification_at(&StubFetcher, &channels, &policy(), now());
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.working, 2);
        assert_eq!(report.summary.failed, 1);
        assert!((report.summary.success_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_success_rate_without_channels_is_zero() {
        assert_eq!(VerificationSummary::default().success_rate(), 0.0);
    }
}
