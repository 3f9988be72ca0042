//! Feature Engineering Engine
//!
//! Computes per-second derivatives between consecutive samples of a vehicle
//! and the normalized Rcz/Rjz ratios used for behavior classification.

mod features;

pub use features::{FeatureConfig, FeatureEngine, Features, MAX_RPM, MAX_SPEED};

use thiserror::Error;

/// Errors during feature derivation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("Non-positive elapsed time {delta_t}s (current: {current}, previous: {previous})")]
    NonPositiveElapsedTime {
        delta_t: f64,
        current: f64,
        previous: f64,
    },
    #[error("Non-finite features over {delta_t}s elapsed time")]
    NonFiniteFeature { delta_t: f64 },
    #[error("Invalid feature configuration: {0}")]
    InvalidConfig(String),
}
