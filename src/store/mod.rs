//! Durable storage for channel series and raised warnings.
//!
//! The pipeline only sees the two traits below. Backends:
//! - `file`    : one JSON blob per series plus a JSON warning document.
//! - `postgres`: `series_blobs` and `warnings` tables.
//! - `memory`  : in-process maps, for tests and dry runs.

pub mod file;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::model::{Series, StoreError};

pub use file::{FileSeriesStore, FileWarningLog};
pub use memory::{MemorySeriesStore, MemoryWarningLog};
pub use self::postgres::PgStore;

/// One series blob per channel, addressed by a stable key.
pub trait SeriesStore: Send + Sync {
    /// Returns `None` when nothing has been stored under `key` yet.
    fn load(&self, key: &str) -> Result<Option<Series>, StoreError>;
    /// Replaces whatever is stored under `key`. Must not leave a partially
    /// written blob behind on failure.
    fn save(&self, key: &str, series: &Series) -> Result<(), StoreError>;
}

/// Durable log of raised warnings keyed by detection day and time. Recording
/// an existing key replaces its message.
pub trait WarningLog: Send + Sync {
    fn record(&self, date_key: &str, time_key: &str, message: &str) -> Result<(), StoreError>;
}

/// Opens the configured backend for both series and warnings.
pub fn open_stores(
    config: &StorageConfig,
) -> Result<(Arc<dyn SeriesStore>, Arc<dyn WarningLog>), StoreError> {
    match config.backend {
        StorageBackend::File => {
            let series = FileSeriesStore::open(config.data_dir.join("series"))?;
            let warnings = FileWarningLog::open(config.data_dir.join("warnings.json"))?;
            Ok((Arc::new(series), Arc::new(warnings)))
        }
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                StoreError::Unavailable("no database URL configured".to_string())
            })?;
            let store = Arc::new(PgStore::connect(url)?);
            Ok((store.clone(), store))
        }
    }
}
