//! Rule-Based Behavior Classification
//!
//! Labels a sample GOOD or BAD against fixed Rcz, Rjz and engine-load bands.

mod rules;

pub use rules::{
    Band, BehaviorClassifier, BehaviorLabel, Classification, LOAD_BAND, RCZ_BAND, RJZ_BAND,
};

use thiserror::Error;

/// Rule errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Invalid behavior label {0}, expected 0 or 1")]
    InvalidLabel(u8),
}
