//! Service configuration.
//!
//! Loaded once per process from a TOML file, then overlaid with environment
//! variables (a `.env` file is honoured via `dotenv`). The resulting
//! `ServiceConfig` is passed explicitly into every component; nothing below
//! `main` reads the environment.
//!
//! ```toml
//! [pipeline]
//! max_age_minutes = 90
//! anomaly_ratio_threshold = 1.5
//! merge_window_size = 24
//!
//! [source]
//! base_url = "https://api.gios.gov.pl/pjp-api/rest/data/getData"
//! utc_offset_hours = 1
//!
//! [storage]
//! backend = "file"      # or "postgres"
//! data_dir = "./data"
//!
//! [notify]
//! webhook_url = "https://hooks.example.org/aq"
//!
//! [[channels]]
//! name = "PM10"
//! source = "92"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::alert::{AnomalyPolicy, StalenessPolicy};
use crate::analysis::DEFAULT_WINDOW_SIZE;
use crate::channels::{validate_channels, Channel};
use crate::ingest::offset_from_hours;

pub const ENV_MAX_AGE_MINUTES: &str = "AQMON_MAX_AGE_MINUTES";
pub const ENV_ANOMALY_RATIO: &str = "AQMON_ANOMALY_RATIO";
pub const ENV_WINDOW_SIZE: &str = "AQMON_WINDOW_SIZE";
pub const ENV_DATA_DIR: &str = "AQMON_DATA_DIR";
pub const ENV_WEBHOOK_URL: &str = "AQMON_WEBHOOK_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

/// Options read by the pipeline on every run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The latest reading is corrupted once it is this many minutes old.
    pub max_age_minutes: f64,
    /// Latest / rolling average ratio above which an anomaly is raised.
    pub anomaly_ratio_threshold: f64,
    /// How many of the most recent readings form the rolling average.
    pub merge_window_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 90.0,
            anomaly_ratio_threshold: 1.5,
            merge_window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn staleness(&self) -> StalenessPolicy {
        StalenessPolicy {
            max_age_minutes: self.max_age_minutes,
        }
    }

    pub fn anomaly(&self) -> AnomalyPolicy {
        AnomalyPolicy {
            ratio_threshold: self.anomaly_ratio_threshold,
        }
    }
}

/// Remote sensor API settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    /// Offset applied to source timestamps that carry no zone of their own.
    pub utc_offset_hours: i32,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.gios.gov.pl/pjp-api/rest/data/getData".to_string(),
            utc_offset_hours: 0,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory holding series blobs and the warning log (file backend).
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("./data"),
            database_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// When unset, warnings are only written to the log.
    pub webhook_url: Option<String>,
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    pub channels: Vec<Channel>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ServiceConfig {
    /// Parses and validates a TOML document. No environment overlay.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, loads `.env`, applies environment overrides and
    /// validates the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: ServiceConfig = toml::from_str(&text)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays values from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_AGE_MINUTES) {
            self.pipeline.max_age_minutes = parse_env(ENV_MAX_AGE_MINUTES, &value)?;
        }
        if let Some(value) = lookup(ENV_ANOMALY_RATIO) {
            self.pipeline.anomaly_ratio_threshold = parse_env(ENV_ANOMALY_RATIO, &value)?;
        }
        if let Some(value) = lookup(ENV_WINDOW_SIZE) {
            self.pipeline.merge_window_size = parse_env(ENV_WINDOW_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_WEBHOOK_URL) {
            self.notify.webhook_url = Some(value).filter(|v| !v.trim().is_empty());
        }
        if let Some(value) = lookup(ENV_DATABASE_URL) {
            self.storage.database_url = Some(value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if !(p.max_age_minutes > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_age_minutes must be positive, got {}",
                p.max_age_minutes
            )));
        }
        if !(p.anomaly_ratio_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "anomaly_ratio_threshold must be positive, got {}",
                p.anomaly_ratio_threshold
            )));
        }
        if p.merge_window_size == 0 {
            return Err(ConfigError::Invalid("merge_window_size must be at least 1".to_string()));
        }
        if offset_from_hours(self.source.utc_offset_hours).is_err() {
            return Err(ConfigError::Invalid(format!(
                "source.utc_offset_hours must be within -23..=23, got {}",
                self.source.utc_offset_hours
            )));
        }
        if self.channels.is_empty() {
            return Err(ConfigError::Invalid("no [[channels]] configured".to_string()));
        }
        validate_channels(&self.channels).map_err(ConfigError::Invalid)?;
        if self.storage.backend == StorageBackend::Postgres && self.storage.database_url.is_none() {
            return Err(ConfigError::Invalid(format!(
                "postgres storage requires storage.database_url or {}",
                ENV_DATABASE_URL
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
