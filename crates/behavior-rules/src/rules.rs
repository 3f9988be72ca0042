//! Threshold Rules

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::RuleError;

/// Inclusive numeric band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies in `[min, max]` (NaN never does)
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.min, self.max)
    }
}

/// Acceptable Rcz band
pub const RCZ_BAND: Band = Band::new(0.9, 1.3);
/// Acceptable Rjz band
pub const RJZ_BAND: Band = Band::new(0.9, 1.3);
/// Acceptable engine load band (%)
pub const LOAD_BAND: Band = Band::new(20.0, 50.0);

/// Driving behavior label, serialized as `1` (good) / `0` (bad)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BehaviorLabel {
    Good,
    Bad,
}

impl BehaviorLabel {
    pub fn is_good(self) -> bool {
        self == BehaviorLabel::Good
    }

    /// Display status used in published records
    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorLabel::Good => "good",
            BehaviorLabel::Bad => "bad",
        }
    }
}

impl From<BehaviorLabel> for u8 {
    fn from(label: BehaviorLabel) -> Self {
        match label {
            BehaviorLabel::Good => 1,
            BehaviorLabel::Bad => 0,
        }
    }
}

impl TryFrom<u8> for BehaviorLabel {
    type Error = RuleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(BehaviorLabel::Good),
            0 => Ok(BehaviorLabel::Bad),
            other => Err(RuleError::InvalidLabel(other)),
        }
    }
}

impl fmt::Display for BehaviorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one sample
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: BehaviorLabel,
    /// One entry per failed rule; empty when GOOD
    pub reasons: Vec<String>,
}

/// Fixed-threshold behavior classifier.
///
/// A sample is GOOD only when Rcz, Rjz and engine load all sit inside
/// their bands.
#[derive(Debug, Clone, Copy, Default)]
pub struct BehaviorClassifier;

impl BehaviorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, rcz: f64, rjz: f64, engine_load: f64) -> Classification {
        let mut reasons = Vec::new();

        if !RCZ_BAND.contains(rcz) {
            reasons.push(format!("Rcz={:.3} out of range {}", rcz, RCZ_BAND));
        }
        if !RJZ_BAND.contains(rjz) {
            reasons.push(format!("Rjz={:.3} out of range {}", rjz, RJZ_BAND));
        }
        if !LOAD_BAND.contains(engine_load) {
            reasons.push(format!("Load={:.1} out of range {}", engine_load, LOAD_BAND));
        }

        let label = if reasons.is_empty() {
            BehaviorLabel::Good
        } else {
            debug!("Bad behavior detected: {}", reasons.join(", "));
            BehaviorLabel::Bad
        };

        Classification { label, reasons }
    }
}
