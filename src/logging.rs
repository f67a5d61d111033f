/// Structured logging for the air-quality monitoring service
///
/// Built on `tracing`. Every pipeline event carries a `channel` field so a
/// single channel's history can be filtered out of a combined log. Supports
/// console output and an append-only log file for daemon operation.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use crate::model::{FetchError, PipelineError, StoreError};

// ---------------------------------------------------------------------------
// Initialisation
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `aqmon_service=<level>`. When
/// `log_file` is given, events are also appended to it without ANSI colours.
pub fn init_logging(level: &str, log_file: Option<&str>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aqmon_service={}", level)));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(tfmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tfmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| std::io::Error::other(e.to_string()))
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - e.g. the source briefly has nothing to say
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a channel run failure.
pub fn classify_failure(err: &PipelineError) -> FailureType {
    match err {
        // Upstream gateways time out routinely; a single miss is not alarming.
        PipelineError::Fetch(FetchError::Http(status)) if (502..=504).contains(status) => {
            FailureType::Expected
        }
        PipelineError::Fetch(FetchError::Http(_)) => FailureType::Unexpected,
        // Parse errors suggest API changes
        PipelineError::Fetch(FetchError::Parse(_)) => FailureType::Unexpected,
        PipelineError::Fetch(FetchError::Unreachable(_)) => FailureType::Unknown,
        PipelineError::Store(StoreError::Corrupt { .. }) => FailureType::Unexpected,
        PipelineError::Store(_) => FailureType::Unknown,
    }
}

/// Log a channel failure with automatic classification.
pub fn log_channel_failure(channel: &str, err: &PipelineError) {
    let failure_type = classify_failure(err);
    match failure_type {
        FailureType::Expected => {
            tracing::debug!(
                channel = %channel,
                failure = %failure_type,
                error = %err,
                "pipeline run failed"
            )
        }
        FailureType::Unexpected => {
            tracing::error!(
                channel = %channel,
                failure = %failure_type,
                error = %err,
                "pipeline run failed"
            )
        }
        FailureType::Unknown => {
            tracing::warn!(
                channel = %channel,
                failure = %failure_type,
                error = %err,
                "pipeline run failed"
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Severity of a run summary: info when all channels completed, error when
/// none did, warn in between.
pub fn summary_level(total: usize, failed: usize) -> tracing::Level {
    if failed == 0 {
        tracing::Level::INFO
    } else if failed >= total {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    }
}

/// Log a summary of one cycle over all channels.
pub fn log_run_summary(total: usize, successful: usize, failed: usize, warnings: usize) {
    let message = format!(
        "Cycle complete: {}/{} channels successful, {} failed, {} warnings raised",
        successful, total, failed, warnings
    );
    let level = summary_level(total, failed);
    if level == tracing::Level::INFO {
        tracing::info!("{}", message);
    } else if level == tracing::Level::ERROR {
        tracing::error!("{}", message);
    } else {
        tracing::warn!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        let gateway = PipelineError::Fetch(FetchError::Http(504));
        assert_eq!(classify_failure(&gateway), FailureType::Expected);

        let server = PipelineError::Fetch(FetchError::Http(500));
        assert_eq!(classify_failure(&server), FailureType::Unexpected);

        let parse = PipelineError::Fetch(FetchError::Parse("bad json".to_string()));
        assert_eq!(classify_failure(&parse), FailureType::Unexpected);

        let offline = PipelineError::Fetch(FetchError::Unreachable("timeout".to_string()));
        assert_eq!(classify_failure(&offline), FailureType::Unknown);
    }

    #[test]
    fn test_summary_level_escalates_with_failures() {
        assert_eq!(summary_level(3, 0), tracing::Level::INFO);
        assert_eq!(summary_level(3, 1), tracing::Level::WARN);
        assert_eq!(summary_level(3, 3), tracing::Level::ERROR);
    }
}
