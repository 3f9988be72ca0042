//! Canonical telemetry sample

use serde::{Deserialize, Serialize};

/// A telemetry record after alias resolution and timestamp normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSample {
    pub vehicle_id: String,
    /// Event time (epoch seconds)
    pub timestamp: f64,
    /// Vehicle speed (km/h)
    pub speed: f64,
    pub engine_rpm: f64,
    /// Engine load (%)
    pub engine_load: f64,
    /// Throttle position (%)
    pub throttle_pos: f64,
}
