//! Latest value and rolling average over a channel's series.

use crate::model::{DerivedStats, Reading, Series};

/// Number of most recent readings averaged by default (hourly data, 24h).
pub const DEFAULT_WINDOW_SIZE: usize = 24;

/// Derives the evaluation snapshot for `series`.
///
/// "Latest" is the reading with the greatest timestamp; timestamps are unique
/// within a series so there are no ties. The rolling average covers the
/// `window_size` most recent readings (or all of them, if fewer exist) and is
/// NaN unless every reading in that window has a parsable value. Gaps are not
/// skipped.
pub fn compute_stats(series: &Series, window_size: usize) -> DerivedStats {
    let latest = series.latest();

    DerivedStats {
        channel_name: series.channel_name.clone(),
        latest_timestamp: latest.map(|r| r.timestamp),
        latest_value: latest.map(Reading::value).unwrap_or(f64::NAN),
        rolling_average: strict_mean(series.by_recency().take(window_size).map(Reading::value)),
    }
}

/// Mean of `values`, or NaN if there are none or any of them is NaN.
fn strict_mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        if value.is_nan() {
            return f64::NAN;
        }
        sum += value;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset};

    fn midnight() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-01T00:00:00+00:00").unwrap()
    }

    /// Readings at 00:00, 00:01, ... carrying the given raw values.
    fn minute_series(values: &[Option<&str>]) -> Series {
        Series::from_readings(
            "PM10",
            values
                .iter()
                .enumerate()
                .map(|(i, raw)| Reading::new(midnight() + Duration::minutes(i as i64), *raw)),
        )
    }

    #[test]
    fn test_full_window_average_and_latest_value() {
        let raws: Vec<String> = (1..=24).map(|v| v.to_string()).collect();
        let series = minute_series(&raws.iter().map(|s| Some(s.as_str())).collect::<Vec<_>>());

        let stats = compute_stats(&series, 24);

        assert_eq!(stats.rolling_average, 12.5, "mean of 1..=24 is 12.5");
        assert_eq!(stats.latest_value, 24.0, "value at 00:23 is the latest");
        assert_eq!(stats.latest_timestamp, Some(midnight() + Duration::minutes(23)));
        assert_eq!(stats.channel_name, "PM10");
    }

    #[test]
    fn test_one_empty_value_in_window_makes_average_nan() {
        let mut raws: Vec<Option<&str>> = vec![Some("10"); 24];
        raws[5] = Some("");
        let stats = compute_stats(&minute_series(&raws), 24);
        assert!(stats.rolling_average.is_nan(), "strict window must refuse gaps");
        assert_eq!(stats.latest_value, 10.0);
    }

    #[test]
    fn test_gap_outside_window_does_not_affect_average() {
        // Oldest reading is blank; the 3 most recent are complete.
        let stats = compute_stats(&minute_series(&[None, Some("2"), Some("4"), Some("6")]), 3);
        assert_eq!(stats.rolling_average, 4.0);
    }

    #[test]
    fn test_window_larger_than_series_averages_what_exists() {
        let stats = compute_stats(&minute_series(&[Some("1"), Some("3")]), 24);
        assert_eq!(stats.rolling_average, 2.0);
    }

    #[test]
    fn test_unparsable_latest_value_is_nan() {
        let stats = compute_stats(&minute_series(&[Some("5"), Some("abc")]), 24);
        assert!(stats.latest_value.is_nan());
        assert!(stats.rolling_average.is_nan());
        assert!(stats.latest_timestamp.is_some(), "timestamp is known even without value");
    }

    #[test]
    fn test_empty_series_has_no_latest_and_nan_values() {
        let stats = compute_stats(&Series::empty("PM10"), 24);
        assert_eq!(stats.latest_timestamp, None);
        assert!(stats.latest_value.is_nan());
        assert!(stats.rolling_average.is_nan());
    }

    #[test]
    fn test_zero_window_yields_nan_average() {
        let stats = compute_stats(&minute_series(&[Some("5")]), 0);
        assert!(stats.rolling_average.is_nan());
        assert_eq!(stats.latest_value, 5.0);
    }
}
