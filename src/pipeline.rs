//! Per-channel ingestion pipeline.
//!
//! fetch → (empty? stop) → load → merge → save → stats → evaluate →
//! record warning → notify
//!
//! Each stage returns a `Result`; the first failure ends the run for that
//! channel. The merged series is saved only after the merge has succeeded in
//! memory, so a failed run never leaves a half-merged series in storage.
//! Channels share no mutable state and run on their own threads.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::alert::evaluate_at;
use crate::analysis::{compute_stats, merge};
use crate::channels::Channel;
use crate::config::PipelineConfig;
use crate::ingest::Fetcher;
use crate::logging::{log_channel_failure, log_run_summary};
use crate::model::{DerivedStats, PipelineError, StoreError, Verdict};
use crate::notify::Notifier;
use crate::store::{SeriesStore, WarningLog};

/// What a successful channel run did.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The source returned no readings; nothing was loaded, saved or evaluated.
    NoNewData,
    Evaluated {
        stats: DerivedStats,
        verdict: Verdict,
        /// Size of the merged series that was saved.
        stored_readings: usize,
    },
}

impl RunOutcome {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            RunOutcome::NoNewData => None,
            RunOutcome::Evaluated { verdict, .. } => Some(verdict),
        }
    }
}

/// Results of running every configured channel once.
#[derive(Debug)]
pub struct CycleReport {
    pub results: Vec<(String, Result<RunOutcome, PipelineError>)>,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Number of channels whose verdict carried a message.
    pub fn warnings(&self) -> usize {
        self.results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .filter_map(RunOutcome::verdict)
            .filter(|v| v.message().is_some())
            .count()
    }
}

/// Keys under which a warning detected at `now` for `channel` is recorded.
/// The channel suffix keeps simultaneous warnings of different channels apart.
pub fn warning_keys(now: DateTime<Utc>, channel: &str) -> (String, String) {
    (
        now.format("%Y-%m-%d").to_string(),
        format!("{}/{}", now.format("%H:%M:%S%.6f"), channel),
    )
}

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn SeriesStore>,
    warnings: Arc<dyn WarningLog>,
    notifier: Arc<dyn Notifier>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn SeriesStore>,
        warnings: Arc<dyn WarningLog>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            warnings,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one channel against the wall clock.
    pub fn run_channel(&self, channel: &Channel) -> Result<RunOutcome, PipelineError> {
        self.run_channel_at(channel, Utc::now())
    }

    /// Runs one channel, treating `now` as the evaluation time.
    pub fn run_channel_at(
        &self,
        channel: &Channel,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, PipelineError> {
        let batch = self.fetcher.fetch(channel)?;
        if batch.is_empty() {
            tracing::info!(channel = %channel.name, "no readings fetched, skipping");
            return Ok(RunOutcome::NoNewData);
        }
        tracing::debug!(channel = %channel.name, fetched = batch.len(), "batch fetched");

        let key = channel.store_key();
        let existing = self.store.load(key)?;
        let merged = merge(existing, batch);
        self.store.save(key, &merged)?;
        tracing::debug!(channel = %channel.name, stored = merged.len(), "series saved");

        let stats = compute_stats(&merged, self.config.merge_window_size);
        let verdict = evaluate_at(&stats, &self.config.staleness(), &self.config.anomaly(), now);
        tracing::info!(
            channel = %channel.name,
            latest = stats.latest_value,
            average = stats.rolling_average,
            verdict = verdict.label(),
            "channel evaluated"
        );

        if let Some(message) = verdict.message() {
            self.raise_warning(channel, message, now)?;
        }

        Ok(RunOutcome::Evaluated {
            stats,
            stored_readings: merged.len(),
            verdict,
        })
    }

    /// Records the warning, then notifies. Notification failures are only
    /// logged; a recording failure is returned after notifying anyway.
    fn raise_warning(
        &self,
        channel: &Channel,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let (date_key, time_key) = warning_keys(now, &channel.name);
        let recorded = self.warnings.record(&date_key, &time_key, message);

        if let Err(e) = self.notifier.send(message) {
            tracing::error!(channel = %channel.name, error = %e, "Failed to send notification");
        }
        recorded
    }

    /// Runs every channel concurrently, one thread each, at `now`.
    pub fn run_all_at(&self, channels: &[Channel], now: DateTime<Utc>) -> CycleReport {
        let results = std::thread::scope(|scope| {
            let handles: Vec<_> = channels
                .iter()
                .map(|channel| {
                    let handle = scope.spawn(move || self.run_channel_at(channel, now));
                    (channel.name.clone(), handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
                    (name, result)
                })
                .collect()
        });
        CycleReport { results }
    }

    /// One full cycle over `channels` with failure and summary logging.
    pub fn run_cycle(&self, channels: &[Channel]) -> CycleReport {
        let report = self.run_all_at(channels, Utc::now());
        for (name, result) in &report.results {
            if let Err(e) = result {
                log_channel_failure(name, e);
            }
        }
        log_run_summary(
            report.results.len(),
            report.succeeded(),
            report.failed(),
            report.warnings(),
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
