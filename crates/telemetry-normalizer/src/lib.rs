//! Telemetry Normalization
//!
//! Turns heterogeneous upstream telemetry payloads into canonical samples:
//! vehicle id resolution, field aliasing, and timestamp parsing.

mod error;
mod normalizer;
mod sample;
mod timestamp;

pub use error::NormalizeError;
pub use normalizer::{resolve_vehicle_id, Normalizer, FIELD_ALIASES};
pub use sample::CanonicalSample;
pub use timestamp::parse_timestamp;
