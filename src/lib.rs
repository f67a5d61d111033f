//! Air-quality monitoring service.
//!
//! Polls per-pollutant sensor channels, folds each fetched batch into the
//! channel's persisted series, derives the latest value and a rolling
//! average, and raises a warning when the data is corrupted or the latest
//! level is anomalously high.
//!
//! Layout:
//! - `ingest`  : fetchers that turn a channel's source into a `Series`.
//! - `analysis`: pure merge and statistics.
//! - `alert`   : staleness and ratio policies, and the combined verdict.
//! - `store`   : persisted series and the warning log.
//! - `notify`  : outbound delivery of warnings.
//! - `pipeline`: the per-channel run and the concurrent cycle.

pub mod alert;
pub mod analysis;
pub mod channels;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod store;
pub mod verify;
