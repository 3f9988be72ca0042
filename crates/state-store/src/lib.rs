//! Vehicle State Store
//!
//! Keeps the last accepted sample per vehicle and evicts vehicles that have
//! been silent for longer than the configured expiry.

mod store;

pub use store::{InMemoryStateStore, StateStore, VehicleState, DEFAULT_EXPIRY_SECONDS};

use thiserror::Error;

/// State store errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateStoreError {
    #[error("State expiry must be a positive number of seconds, got {0}")]
    InvalidExpiry(f64),
}
