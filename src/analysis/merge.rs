//! Deduplicating merge of a fetched batch into a persisted series.

use crate::model::Series;

/// Merges `incoming` into `existing`.
///
/// - No existing series: `incoming` is returned unchanged.
/// - Otherwise every existing reading whose timestamp is absent from
///   `incoming` is carried over. At a shared timestamp the incoming reading
///   wins outright; values are never reconciled.
/// - The result takes its channel name from `incoming`.
pub fn merge(existing: Option<Series>, incoming: Series) -> Series {
    let Some(existing) = existing else {
        return incoming;
    };

    let mut merged = incoming;
    for reading in existing.into_readings() {
        if !merged.contains(&reading.timestamp) {
            merged.insert(reading);
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
