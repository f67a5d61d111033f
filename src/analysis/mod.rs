//! Series maintenance and summary statistics for the monitoring service.
//!
//! Everything here is pure: no I/O, no clock. The pipeline feeds it fetched
//! and persisted series and decides what to do with the results.
//!
//! Submodules:
//! - `merge`: folds a fetched batch into the persisted series.
//! - `stats`: latest value and rolling average over a merged series.

pub mod merge;
pub mod stats;

pub use merge::merge;
pub use stats::{compute_stats, DEFAULT_WINDOW_SIZE};
