//! MQTT Bridge
//!
//! Connects the driving behavior processor to the message bus:
//! - Subscribes to raw telemetry (`vehicles/+/telemetry_raw`)
//! - Feeds each message through the processor, one at a time
//! - Publishes classified samples to `vehicles/{vehicleId}/telemetry`

mod bridge;

pub use bridge::MqttBridge;

use processor::{DrivingBehaviorProcessor, ProcessedSample};
use serde::{Deserialize, Serialize};
use state_store::StateStore;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Placeholder substituted with the vehicle id in the output topic pattern
pub const VEHICLE_ID_PLACEHOLDER: &str = "{vehicleId}";

/// Bridge error types
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Broker and topic configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// MQTT broker host
    pub host: String,
    /// MQTT port
    pub port: u16,
    /// Client id prefix; a random suffix is appended per connection
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
    /// Subscription filter for raw telemetry
    pub input_topic: String,
    /// Output topic pattern containing `{vehicleId}`
    pub output_topic: String,
    /// Request queue capacity between client and event loop
    pub channel_capacity: usize,
    /// Delay before polling again after a connection error
    pub reconnect_delay_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id_prefix: "driving-behavior".to_string(),
            keep_alive_secs: 60,
            input_topic: "vehicles/+/telemetry_raw".to_string(),
            output_topic: "vehicles/{vehicleId}/telemetry".to_string(),
            channel_capacity: 64,
            reconnect_delay_secs: 5,
        }
    }
}

/// Output topic for a vehicle
pub fn output_topic(pattern: &str, vehicle_id: &str) -> String {
    pattern.replace(VEHICLE_ID_PLACEHOLDER, vehicle_id)
}

/// Sink for serialized samples
pub trait SamplePublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BridgeError>;
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// A classified sample was published
    Published { topic: String },
    /// First sample for the vehicle; state seeded, nothing published
    Initialized,
    /// Message dropped (already logged)
    Dropped,
}

/// Run one inbound message through the processor and publish any result.
///
/// Never fails: every problem is logged and the message is dropped.
pub fn route_message<S, P>(
    processor: &DrivingBehaviorProcessor<S>,
    publisher: &P,
    output_pattern: &str,
    topic: &str,
    payload: &[u8],
) -> RouteOutcome
where
    S: StateStore,
    P: SamplePublisher + ?Sized,
{
    match processor.handle_message(topic, payload) {
        Ok(Some(sample)) => match publish_sample(publisher, output_pattern, &sample) {
            Ok(out_topic) => {
                debug!("Published to '{}'", out_topic);
                RouteOutcome::Published { topic: out_topic }
            }
            Err(e) => {
                error!("Failed to publish result for {}: {}", sample.vehicle_id, e);
                RouteOutcome::Dropped
            }
        },
        Ok(None) => RouteOutcome::Initialized,
        Err(e) if e.is_anomaly() => {
            warn!("{}", e);
            RouteOutcome::Dropped
        }
        Err(e) => {
            error!("Dropped message on '{}': {}", topic, e);
            RouteOutcome::Dropped
        }
    }
}

fn publish_sample<P: SamplePublisher + ?Sized>(
    publisher: &P,
    output_pattern: &str,
    sample: &ProcessedSample,
) -> Result<String, BridgeError> {
    let payload =
        serde_json::to_vec(sample).map_err(|e| BridgeError::Serialization(e.to_string()))?;
    let topic = output_topic(output_pattern, &sample.vehicle_id);
    publisher.publish(&topic, payload)?;
    Ok(topic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use processor::ProcessorConfig;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl SamplePublisher for RecordingPublisher {
        fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BridgeError> {
            self.sent.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }

    struct FailingPublisher;

    impl SamplePublisher for FailingPublisher {
        fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), BridgeError> {
            Err(BridgeError::Publish("queue full".to_string()))
        }
    }

    fn raw(timestamp: &str, rpm: u32, throttle: u32) -> Vec<u8> {
        format!(
            r#"{{"timestamp":"{}","rpm":{},"speed":72,"throttle_position":{},"engine_load":60}}"#,
            timestamp, rpm, throttle
        )
        .into_bytes()
    }

    #[test]
    fn test_output_topic() {
        assert_eq!(
            output_topic("vehicles/{vehicleId}/telemetry", "CAD-7002"),
            "vehicles/CAD-7002/telemetry"
        );
        assert_eq!(output_topic("fixed/topic", "CAD-7002"), "fixed/topic");
    }

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.port, 1883);
        assert_eq!(config.input_topic, "vehicles/+/telemetry_raw");
        assert!(config.output_topic.contains(VEHICLE_ID_PLACEHOLDER));
    }

    #[test]
    fn test_route_publishes_second_sample() {
        let processor = DrivingBehaviorProcessor::new(ProcessorConfig::default()).unwrap();
        let publisher = RecordingPublisher::default();
        let pattern = "vehicles/{vehicleId}/telemetry";
        let topic = "vehicles/CAD-7002/telemetry_raw";

        let first = route_message(
            &processor,
            &publisher,
            pattern,
            topic,
            &raw("2025-08-11T09:20:00Z", 2500, 45),
        );
        assert_eq!(first, RouteOutcome::Initialized);

        let second = route_message(
            &processor,
            &publisher,
            pattern,
            topic,
            &raw("2025-08-11T09:20:01Z", 2520, 46),
        );
        assert_eq!(
            second,
            RouteOutcome::Published {
                topic: "vehicles/CAD-7002/telemetry".to_string()
            }
        );

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&sent[0].1).unwrap();
        assert_eq!(body["vehicle_id"], "CAD-7002");
        assert_eq!(body["engine_rpm"], 2520.0);
        assert_eq!(body["throttle_pos"], 46.0);
        // load 60 is outside [20, 50]
        assert_eq!(body["behavior_label"], 0);
    }

    #[test]
    fn test_route_drops_bad_messages() {
        let processor = DrivingBehaviorProcessor::new(ProcessorConfig::default()).unwrap();
        let publisher = RecordingPublisher::default();
        let pattern = "vehicles/{vehicleId}/telemetry";

        let outcome = route_message(&processor, &publisher, pattern, "vehicles/X/raw", b"{oops");
        assert_eq!(outcome, RouteOutcome::Dropped);

        let topic = "vehicles/X/telemetry_raw";
        let fresh = raw("2025-08-11T09:20:05Z", 2500, 45);
        let stale = raw("2025-08-11T09:20:00Z", 2500, 45);
        route_message(&processor, &publisher, pattern, topic, &fresh);
        let stale = route_message(&processor, &publisher, pattern, topic, &stale);
        assert_eq!(stale, RouteOutcome::Dropped);
        assert!(publisher.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_route_survives_publish_failure() {
        let processor = DrivingBehaviorProcessor::new(ProcessorConfig::default()).unwrap();
        let pattern = "vehicles/{vehicleId}/telemetry";
        let topic = "vehicles/Z/telemetry_raw";

        route_message(&processor, &FailingPublisher, pattern, topic, &raw("100", 2500, 45));
        let outcome =
            route_message(&processor, &FailingPublisher, pattern, topic, &raw("101", 2520, 46));
        assert_eq!(outcome, RouteOutcome::Dropped);
        // the transition was still accepted and counted
        assert_eq!(processor.summary().unwrap().total_processed, 1);
    }
}
