//! Processor configuration

use feature_engine::FeatureConfig;
use serde::{Deserialize, Serialize};
use state_store::DEFAULT_EXPIRY_SECONDS;

/// Processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Inactivity window before a vehicle's state is discarded (seconds)
    pub state_expiry_seconds: f64,

    /// Rjz throttle-derivative normalization maximum (from training data)
    pub global_max_throttle_d: f64,

    /// Rjz RPM-derivative normalization maximum (from training data)
    pub global_max_rpm_d: f64,

    /// Log a statistics summary every N processed messages
    pub summary_interval: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            state_expiry_seconds: DEFAULT_EXPIRY_SECONDS,
            global_max_throttle_d: 100.0,
            global_max_rpm_d: 1000.0,
            summary_interval: 100,
        }
    }
}

impl ProcessorConfig {
    /// Feature engine settings carried by this config
    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            global_max_throttle_d: self.global_max_throttle_d,
            global_max_rpm_d: self.global_max_rpm_d,
        }
    }
}
