//! In-process stores for tests and dry runs. Nothing survives the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::{SeriesStore, WarningLog};
use crate::model::{Series, StoreError};

#[derive(Default)]
pub struct MemorySeriesStore {
    series: Mutex<HashMap<String, Series>>,
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what is stored under `key`.
    pub fn get(&self, key: &str) -> Option<Series> {
        self.series
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

impl SeriesStore for MemorySeriesStore {
    fn load(&self, key: &str) -> Result<Option<Series>, StoreError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, series: &Series) -> Result<(), StoreError> {
        self.series
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), series.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryWarningLog {
    entries: Mutex<BTreeMap<(String, String), String>>,
}

impl MemoryWarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded warnings as `(date_key, time_key, message)`, ordered by key.
    pub fn entries(&self) -> Vec<(String, String, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|((date, time), message)| (date.clone(), time.clone(), message.clone()))
            .collect()
    }
}

impl WarningLog for MemoryWarningLog {
    fn record(&self, date_key: &str, time_key: &str, message: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((date_key.to_string(), time_key.to_string()), message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_warning_log_replaces_same_key() {
        let log = MemoryWarningLog::new();
        log.record("2024-05-01", "13:00:00", "a").unwrap();
        log.record("2024-05-01", "13:00:00", "b").unwrap();
        assert_eq!(
            log.entries(),
            vec![("2024-05-01".to_string(), "13:00:00".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn test_memory_series_store_load_of_unknown_key_is_none() {
        let store = MemorySeriesStore::new();
        assert!(store.load("PM10").unwrap().is_none());
        store.save("PM10", &Series::empty("PM10")).unwrap();
        assert!(store.load("PM10").unwrap().is_some());
    }
}
