//! Raw Payload Normalization

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::NormalizeError;
use crate::sample::CanonicalSample;
use crate::timestamp::parse_timestamp;

/// Field aliases published by older firmware: (canonical, alias)
pub const FIELD_ALIASES: [(&str, &str); 2] = [
    ("engine_rpm", "rpm"),
    ("throttle_pos", "throttle_position"),
];

/// Normalizes heterogeneous upstream payloads into [`CanonicalSample`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    /// Create a new normalizer
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw message body and normalize it
    pub fn normalize_bytes(
        &self,
        payload: &[u8],
        topic: &str,
    ) -> Result<CanonicalSample, NormalizeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| NormalizeError::MalformedPayload(e.to_string()))?;
        debug!("Raw payload on '{}': {}", topic, value);
        self.normalize(value, topic)
    }

    /// Normalize an already-parsed payload
    pub fn normalize(&self, payload: Value, topic: &str) -> Result<CanonicalSample, NormalizeError> {
        let mut fields = match payload {
            Value::Object(map) => map,
            other => {
                return Err(NormalizeError::MalformedPayload(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let vehicle_id = resolve_vehicle_id(&fields, topic)?;
        apply_aliases(&mut fields);

        let timestamp = fields
            .get("timestamp")
            .ok_or_else(|| NormalizeError::MissingOrInvalidTimestamp("field absent".to_string()))
            .and_then(parse_timestamp)?;

        Ok(CanonicalSample {
            vehicle_id,
            timestamp,
            speed: numeric_field(&fields, "speed")?,
            engine_rpm: numeric_field(&fields, "engine_rpm")?,
            engine_load: numeric_field(&fields, "engine_load")?,
            throttle_pos: numeric_field(&fields, "throttle_pos")?,
        })
    }
}

/// Vehicle id from the payload, else the second segment of the topic
/// (`vehicles/{id}/...`).
pub fn resolve_vehicle_id(fields: &Map<String, Value>, topic: &str) -> Result<String, NormalizeError> {
    let from_payload = match fields.get("vehicle_id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    from_payload
        .or_else(|| {
            topic
                .split('/')
                .nth(1)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| NormalizeError::MissingVehicleId {
            topic: topic.to_string(),
        })
}

/// Copy alias values onto canonical names that are absent
fn apply_aliases(fields: &mut Map<String, Value>) {
    for (canonical, alias) in FIELD_ALIASES {
        if fields.contains_key(canonical) {
            continue;
        }
        if let Some(value) = fields.get(alias).cloned() {
            fields.insert(canonical.to_string(), value);
        }
    }
}

/// Read a finite number, accepting numeric strings
fn numeric_field(fields: &Map<String, Value>, field: &'static str) -> Result<f64, NormalizeError> {
    let value = fields.get(field).ok_or(NormalizeError::MissingField(field))?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    number
        .filter(|v| v.is_finite())
        .ok_or_else(|| NormalizeError::InvalidValue {
            field,
            value: value.to_string(),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "vehicle_id": "ABC123",
            "timestamp": 1634567890.123,
            "speed": 65.5,
            "engine_rpm": 2500,
            "engine_load": 35.2,
            "throttle_pos": 45.8
        })
    }

    #[test]
    fn test_canonical_payload() {
        let sample = Normalizer::new()
            .normalize(full_payload(), "vehicles/ignored/telemetry_raw")
            .unwrap();
        assert_eq!(sample.vehicle_id, "ABC123");
        assert_eq!(sample.timestamp, 1634567890.123);
        assert_eq!(sample.speed, 65.5);
        assert_eq!(sample.engine_rpm, 2500.0);
        assert_eq!(sample.engine_load, 35.2);
        assert_eq!(sample.throttle_pos, 45.8);
    }

    #[test]
    fn test_aliases_and_topic_vehicle_id() {
        let payload = json!({
            "timestamp": "2025-08-11T09:20:00Z",
            "rpm": 2500,
            "speed": 72,
            "throttle_position": 45,
            "engine_load": 60
        });
        let sample = Normalizer::new()
            .normalize(payload, "vehicles/CAD-7002/telemetry_raw")
            .unwrap();
        assert_eq!(sample.vehicle_id, "CAD-7002");
        assert_eq!(sample.engine_rpm, 2500.0);
        assert_eq!(sample.throttle_pos, 45.0);
        assert_eq!(sample.timestamp, 1_754_904_000.0);
    }

    #[test]
    fn test_canonical_name_wins_over_alias() {
        let mut payload = full_payload();
        payload["rpm"] = json!(9999);
        payload["throttle_position"] = json!(1);
        let sample = Normalizer::new().normalize(payload, "vehicles/x/raw").unwrap();
        assert_eq!(sample.engine_rpm, 2500.0);
        assert_eq!(sample.throttle_pos, 45.8);
    }

    #[test]
    fn test_missing_vehicle_id() {
        let mut payload = full_payload();
        payload.as_object_mut().unwrap().remove("vehicle_id");

        let err = Normalizer::new().normalize(payload.clone(), "telemetry").unwrap_err();
        assert!(matches!(err, NormalizeError::MissingVehicleId { .. }));

        let err = Normalizer::new().normalize(payload, "vehicles//raw").unwrap_err();
        assert!(matches!(err, NormalizeError::MissingVehicleId { .. }));
    }

    #[test]
    fn test_missing_and_invalid_timestamp() {
        let mut payload = full_payload();
        payload.as_object_mut().unwrap().remove("timestamp");
        let err = Normalizer::new().normalize(payload.clone(), "vehicles/a/b").unwrap_err();
        assert!(matches!(err, NormalizeError::MissingOrInvalidTimestamp(_)));

        payload["timestamp"] = json!("not-a-time");
        let err = Normalizer::new().normalize(payload, "vehicles/a/b").unwrap_err();
        assert!(matches!(err, NormalizeError::MissingOrInvalidTimestamp(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let mut payload = full_payload();
        payload.as_object_mut().unwrap().remove("engine_load");
        let err = Normalizer::new().normalize(payload, "vehicles/a/b").unwrap_err();
        assert_eq!(err, NormalizeError::MissingField("engine_load"));
    }

    #[test]
    fn test_numeric_strings_and_invalid_values() {
        let mut payload = full_payload();
        payload["speed"] = json!("80.5");
        let sample = Normalizer::new().normalize(payload.clone(), "vehicles/a/b").unwrap();
        assert_eq!(sample.speed, 80.5);

        payload["speed"] = json!("fast");
        let err = Normalizer::new().normalize(payload, "vehicles/a/b").unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidValue { field: "speed", .. }));
    }

    #[test]
    fn test_malformed_bytes() {
        let normalizer = Normalizer::new();
        assert!(matches!(
            normalizer.normalize_bytes(b"{not json", "vehicles/a/b"),
            Err(NormalizeError::MalformedPayload(_))
        ));
        assert!(matches!(
            normalizer.normalize_bytes(b"[1, 2, 3]", "vehicles/a/b"),
            Err(NormalizeError::MalformedPayload(_))
        ));
    }
}
