//! File-backed stores.
//!
//! Series live at `<dir>/<key>.json`. Every write goes to a sibling temp
//! file that is renamed over the target, so a crash mid-write leaves the
//! previous blob intact.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{SeriesStore, WarningLog};
use crate::model::{Series, StoreError};

fn io_error(key: &str) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

/// Writes `bytes` to `path` via a temp file and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// Maps a store key to a safe file stem.
pub fn file_stem_for(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Series blobs
// ---------------------------------------------------------------------------

pub struct FileSeriesStore {
    dir: PathBuf,
}

impl FileSeriesStore {
    /// Opens (creating if needed) the directory holding series blobs.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(io_error(&dir.display().to_string()))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem_for(key)))
    }
}

impl SeriesStore for FileSeriesStore {
    fn load(&self, key: &str) -> Result<Option<Series>, StoreError> {
        let bytes = match std::fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(key)(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, key: &str, series: &Series) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(series).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path_for(key), &bytes).map_err(io_error(key))
    }
}

// ---------------------------------------------------------------------------
// Warning log
// ---------------------------------------------------------------------------

/// `{ "2024-05-01": { "13:00:00": "message", ... }, ... }`
type WarningDocument = BTreeMap<String, BTreeMap<String, String>>;

pub struct FileWarningLog {
    path: PathBuf,
    // Serializes read-modify-write cycles between channel threads.
    lock: Mutex<()>,
}

impl FileWarningLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error("warnings"))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Reads the whole warning document. Missing file reads as empty.
    pub fn read_all(&self) -> Result<WarningDocument, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                key: "warnings".to_string(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(WarningDocument::new()),
            Err(e) => Err(io_error("warnings")(e)),
        }
    }
}

impl WarningLog for FileWarningLog {
    fn record(&self, date_key: &str, time_key: &str, message: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut document = self.read_all()?;
        document
            .entry(date_key.to_string())
            .or_default()
            .insert(time_key.to_string(), message.to_string());

        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| StoreError::Corrupt {
            key: "warnings".to_string(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path, &bytes).map_err(io_error("warnings"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reading;
    use chrono::{DateTime, FixedOffset};

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn sample() -> Series {
        Series::from_readings(
            "PM10",
            vec![
                Reading::new(at("2024-05-01T12:00:00+02:00"), Some("10")),
                Reading::new(at("2024-05-01T13:00:00+02:00"), None),
            ],
        )
    }

    #[test]
    fn test_load_of_unknown_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSeriesStore::open(dir.path()).unwrap();
        assert!(store.load("PM10").unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_restores_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSeriesStore::open(dir.path().join("series")).unwrap();
        store.save("PM10", &sample()).unwrap();
        assert_eq!(store.load("PM10").unwrap(), Some(sample()));
        assert!(
            !dir.path().join("series/PM10.json.tmp").exists(),
            "temp file should be renamed away"
        );
    }

    #[test]
    fn test_save_replaces_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSeriesStore::open(dir.path()).unwrap();
        store.save("PM10", &sample()).unwrap();
        store.save("PM10", &Series::empty("PM10")).unwrap();
        assert_eq!(store.load("PM10").unwrap().unwrap().len(), 0);
    }

    #[test]
    fn test_corrupt_blob_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSeriesStore::open(dir.path()).unwrap();
        std::fs::write(store.path_for("PM10"), b"{not json").unwrap();
        assert!(matches!(store.load("PM10"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_keys_are_sanitised_to_file_names() {
        assert_eq!(file_stem_for("PM2.5"), "PM2.5");
        assert_eq!(file_stem_for("krakow/pm 10"), "krakow_pm_10");
    }

    #[test]
    fn test_warning_log_insert_or_replace() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileWarningLog::open(dir.path().join("warnings.json")).unwrap();

        log.record("2024-05-01", "13:00:00", "first").unwrap();
        log.record("2024-05-01", "14:00:00", "second").unwrap();
        log.record("2024-05-01", "13:00:00", "replaced").unwrap();

        let document = log.read_all().unwrap();
        let day = &document["2024-05-01"];
        assert_eq!(day.len(), 2);
        assert_eq!(day["13:00:00"], "replaced");
        assert_eq!(day["14:00:00"], "second");
    }
}
