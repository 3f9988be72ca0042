//! Derivative and Ratio Features

use serde::{Deserialize, Serialize};
use state_store::VehicleState;
use telemetry_normalizer::CanonicalSample;
use tracing::{debug, warn};

use crate::FeatureError;

/// Speed normalization range (km/h)
pub const MAX_SPEED: f64 = 220.0;
/// Engine speed normalization range (RPM)
pub const MAX_RPM: f64 = 8000.0;

/// Normalization maxima for Rjz, taken from offline analysis of training data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Largest throttle derivative seen in training data (%/s)
    pub global_max_throttle_d: f64,
    /// Largest RPM derivative seen in training data (RPM/s)
    pub global_max_rpm_d: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            global_max_throttle_d: 100.0,
            global_max_rpm_d: 1000.0,
        }
    }
}

/// Features computed for one accepted transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
    /// Elapsed event time since the previous sample (s)
    pub delta_t: f64,
    pub speed_d: f64,
    pub rpm_d: f64,
    pub throttle_d: f64,
    /// Normalized speed-to-RPM ratio
    pub rcz: f64,
    /// Normalized throttle-rate-to-RPM-rate ratio
    pub rjz: f64,
}

/// Computes features from a vehicle's previous state and its new sample
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    /// Create a feature engine, rejecting maxima that are not positive and finite
    pub fn new(config: FeatureConfig) -> Result<Self, FeatureError> {
        for (name, value) in [
            ("global_max_throttle_d", config.global_max_throttle_d),
            ("global_max_rpm_d", config.global_max_rpm_d),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(FeatureError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(Self { config })
    }

    /// Active configuration
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Derive features for `cur` against the previous accepted state.
    ///
    /// Stale, duplicate, and out-of-order samples (`delta_t <= 0`) are rejected
    /// so the caller can leave the stored state untouched. So is an elapsed
    /// time too small to divide by without overflowing to infinity.
    pub fn derive(&self, prev: &VehicleState, cur: &CanonicalSample) -> Result<Features, FeatureError> {
        let delta_t = cur.timestamp - prev.last_timestamp;
        if delta_t <= 0.0 {
            return Err(FeatureError::NonPositiveElapsedTime {
                delta_t,
                current: cur.timestamp,
                previous: prev.last_timestamp,
            });
        }

        let speed_d = (cur.speed - prev.last_speed) / delta_t;
        let rpm_d = (cur.engine_rpm - prev.last_rpm) / delta_t;
        let throttle_d = (cur.throttle_pos - prev.last_throttle) / delta_t;

        debug!(
            "[{}] Derivatives - speed_d={:.2}, rpm_d={:.2}, throttle_d={:.2}",
            cur.vehicle_id, speed_d, rpm_d, throttle_d
        );

        let features = Features {
            delta_t,
            speed_d,
            rpm_d,
            throttle_d,
            rcz: Self::rcz(cur.speed, cur.engine_rpm),
            rjz: self.rjz(throttle_d, rpm_d),
        };

        let values = [speed_d, rpm_d, throttle_d, features.rcz, features.rjz];
        if values.iter().all(|v| v.is_finite()) {
            Ok(features)
        } else {
            Err(FeatureError::NonFiniteFeature { delta_t })
        }
    }

    /// Rcz = (speed / MAX_SPEED) / (rpm / MAX_RPM); 0.0 when rpm is zero
    pub fn rcz(speed: f64, rpm: f64) -> f64 {
        if rpm == 0.0 {
            warn!("RPM is zero, Rcz set to 0.0");
            return 0.0;
        }
        (speed / MAX_SPEED) / (rpm / MAX_RPM)
    }

    /// Rjz = normalized throttle derivative / normalized RPM derivative;
    /// 0.0 when the normalized RPM derivative is zero
    pub fn rjz(&self, throttle_d: f64, rpm_d: f64) -> f64 {
        let normalized_throttle_d = throttle_d / self.config.global_max_throttle_d;
        let normalized_rpm_d = rpm_d / self.config.global_max_rpm_d;

        if normalized_rpm_d == 0.0 {
            debug!("Normalized RPM derivative is zero, Rjz set to 0.0");
            return 0.0;
        }
        normalized_throttle_d / normalized_rpm_d
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self {
            config: FeatureConfig::default(),
        }
    }
}
