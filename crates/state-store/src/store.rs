//! Keyed Store Implementation

use crate::StateStoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Default inactivity window before a vehicle is evicted (30 minutes)
pub const DEFAULT_EXPIRY_SECONDS: f64 = 1800.0;

/// Last accepted sample for one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Event time of the sample (epoch seconds)
    pub last_timestamp: f64,
    pub last_speed: f64,
    pub last_rpm: f64,
    pub last_throttle: f64,
    /// Wall-clock time this entry was written, used for expiry
    pub last_update: f64,
}

/// Keyed access to per-vehicle state.
///
/// Callers sharing a store across threads must hold one lock around
/// `get` -> compute -> `put` for a vehicle, and around `sweep`.
pub trait StateStore {
    /// Previous state for a vehicle, if tracked
    fn get(&self, vehicle_id: &str) -> Option<VehicleState>;

    /// Overwrite the state for a vehicle
    fn put(&mut self, vehicle_id: &str, state: VehicleState);

    /// Evict every vehicle with `now - last_update > expiry`, returning their ids
    fn sweep(&mut self, now: f64) -> Vec<String>;

    /// Number of tracked vehicles
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// HashMap-backed store
#[derive(Debug)]
pub struct InMemoryStateStore {
    states: HashMap<String, VehicleState>,
    expiry_seconds: f64,
}

impl InMemoryStateStore {
    /// Create a store with the given inactivity expiry
    pub fn new(expiry_seconds: f64) -> Result<Self, StateStoreError> {
        if !(expiry_seconds.is_finite() && expiry_seconds > 0.0) {
            return Err(StateStoreError::InvalidExpiry(expiry_seconds));
        }
        info!("Creating vehicle state store (expiry: {}s)", expiry_seconds);
        Ok(Self {
            states: HashMap::new(),
            expiry_seconds,
        })
    }

    /// Configured expiry in seconds
    pub fn expiry_seconds(&self) -> f64 {
        self.expiry_seconds
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            expiry_seconds: DEFAULT_EXPIRY_SECONDS,
        }
    }
}

impl StateStore for InMemoryStateStore {
    fn get(&self, vehicle_id: &str) -> Option<VehicleState> {
        self.states.get(vehicle_id).copied()
    }

    fn put(&mut self, vehicle_id: &str, mut state: VehicleState) {
        match self.states.get_mut(vehicle_id) {
            Some(existing) => {
                // last_update never moves backwards, even if the wall clock does
                state.last_update = state.last_update.max(existing.last_update);
                *existing = state;
            }
            None => {
                self.states.insert(vehicle_id.to_string(), state);
            }
        }
    }

    fn sweep(&mut self, now: f64) -> Vec<String> {
        let expiry = self.expiry_seconds;
        let expired: Vec<String> = self
            .states
            .iter()
            .filter(|(_, state)| now - state.last_update > expiry)
            .map(|(id, _)| id.clone())
            .collect();

        for vehicle_id in &expired {
            self.states.remove(vehicle_id);
            info!("Removed expired state for vehicle: {}", vehicle_id);
        }
        if !expired.is_empty() {
            debug!("Active vehicles after sweep: {}", self.states.len());
        }

        expired
    }

    fn len(&self) -> usize {
        self.states.len()
    }
}
