//! Normalization Error Types

use thiserror::Error;

/// Errors while turning a raw payload into a canonical sample
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    /// Body is not a JSON object
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No vehicle id in the payload and none derivable from the topic
    #[error("Cannot resolve vehicle_id from payload or topic '{topic}'")]
    MissingVehicleId { topic: String },

    /// Timestamp absent, or neither ISO-8601 nor numeric epoch
    #[error("Missing or invalid timestamp: {0}")]
    MissingOrInvalidTimestamp(String),

    /// Required numeric field absent after alias resolution
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Required field present but not a finite number
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
