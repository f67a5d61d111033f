//! Ratio threshold checking against the rolling average.

/// Trigger level for "latest is far above the recent average".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyPolicy {
    pub ratio_threshold: f64,
}

/// Returns `true` when `latest / average` is strictly greater than the
/// policy's ratio. Callers must rule out NaN and zero averages first; with
/// either, this returns `false` (NaN) or compares against infinity.
pub fn exceeds_ratio(latest: f64, average: f64, policy: &AnomalyPolicy) -> bool {
    latest / average > policy.ratio_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: AnomalyPolicy = AnomalyPolicy { ratio_threshold: 1.5 };

    #[test]
    fn test_ratio_equal_to_threshold_does_not_trigger() {
        assert!(!exceeds_ratio(150.0, 100.0, &POLICY), "1.5 is not > 1.5");
    }

    #[test]
    fn test_ratio_above_threshold_triggers() {
        assert!(exceeds_ratio(151.0, 100.0, &POLICY));
    }

    #[test]
    fn test_nan_inputs_never_trigger() {
        assert!(!exceeds_ratio(f64::NAN, 100.0, &POLICY));
        assert!(!exceeds_ratio(150.0, f64::NAN, &POLICY));
    }
}
