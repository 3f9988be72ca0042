//! Processing Error Types

use feature_engine::FeatureError;
use state_store::StateStoreError;
use telemetry_normalizer::NormalizeError;
use thiserror::Error;

/// Why a message was dropped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    /// Body not parseable as a JSON object
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Cannot resolve vehicle_id from payload or topic '{0}'")]
    MissingVehicleId(String),

    #[error("Missing or invalid timestamp: {0}")]
    MissingOrInvalidTimestamp(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidFieldValue { field: &'static str, value: String },

    /// Stale, duplicate or out-of-order sample; stored state was left untouched
    #[error("Invalid time delta for {vehicle_id}: {delta_t}s (current: {current}, previous: {previous})")]
    NonPositiveElapsedTime {
        vehicle_id: String,
        delta_t: f64,
        current: f64,
        previous: f64,
    },

    /// Elapsed time too small for finite derivatives; stored state was left untouched
    #[error("Non-finite features for {vehicle_id} over {delta_t}s")]
    NonFiniteFeature { vehicle_id: String, delta_t: f64 },

    #[error("Vehicle state unavailable: {0}")]
    StateUnavailable(String),

    #[error("Invalid processor configuration: {0}")]
    InvalidConfig(String),
}

impl ProcessError {
    /// Anomalies are expected in a live stream and logged as warnings;
    /// everything else is logged as an error.
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            ProcessError::NonPositiveElapsedTime { .. } | ProcessError::NonFiniteFeature { .. }
        )
    }

    /// Stable snake_case name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::MalformedPayload(_) => "malformed_payload",
            ProcessError::MissingVehicleId(_) => "missing_vehicle_id",
            ProcessError::MissingOrInvalidTimestamp(_) => "missing_or_invalid_timestamp",
            ProcessError::MissingRequiredField(_) => "missing_required_field",
            ProcessError::InvalidFieldValue { .. } => "invalid_field_value",
            ProcessError::NonPositiveElapsedTime { .. } => "non_positive_elapsed_time",
            ProcessError::NonFiniteFeature { .. } => "non_finite_feature",
            ProcessError::StateUnavailable(_) => "state_unavailable",
            ProcessError::InvalidConfig(_) => "invalid_config",
        }
    }

    pub(crate) fn from_feature(vehicle_id: &str, err: FeatureError) -> Self {
        match err {
            FeatureError::NonPositiveElapsedTime {
                delta_t,
                current,
                previous,
            } => ProcessError::NonPositiveElapsedTime {
                vehicle_id: vehicle_id.to_string(),
                delta_t,
                current,
                previous,
            },
            FeatureError::NonFiniteFeature { delta_t } => ProcessError::NonFiniteFeature {
                vehicle_id: vehicle_id.to_string(),
                delta_t,
            },
            FeatureError::InvalidConfig(msg) => ProcessError::InvalidConfig(msg),
        }
    }
}

impl From<NormalizeError> for ProcessError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MalformedPayload(msg) => ProcessError::MalformedPayload(msg),
            NormalizeError::MissingVehicleId { topic } => ProcessError::MissingVehicleId(topic),
            NormalizeError::MissingOrInvalidTimestamp(msg) => {
                ProcessError::MissingOrInvalidTimestamp(msg)
            }
            NormalizeError::MissingField(field) => ProcessError::MissingRequiredField(field),
            NormalizeError::InvalidValue { field, value } => {
                ProcessError::InvalidFieldValue { field, value }
            }
        }
    }
}

impl From<StateStoreError> for ProcessError {
    fn from(err: StateStoreError) -> Self {
        ProcessError::InvalidConfig(err.to_string())
    }
}
