//! Alerting policy: staleness, ratio thresholds, and the combined verdict.

pub mod health;
pub mod stalenesses;
pub mod thresholds;

pub use health::{evaluate, evaluate_at};
pub use stalenesses::StalenessPolicy;
pub use thresholds::AnomalyPolicy;
