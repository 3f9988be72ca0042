//! MQTT event loop

use processor::DrivingBehaviorProcessor;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use state_store::StateStore;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{route_message, BridgeError, BrokerConfig, SamplePublisher};

/// How long to keep polling after shutdown so the DISCONNECT goes out
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

impl SamplePublisher for AsyncClient {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BridgeError> {
        // Non-blocking: the event loop that drains this queue is our own caller
        self.try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| BridgeError::Publish(e.to_string()))
    }
}

/// MQTT bridge around a processor
pub struct MqttBridge {
    config: BrokerConfig,
}

impl MqttBridge {
    /// Create new bridge
    pub fn new(config: BrokerConfig) -> Self {
        info!(
            "Broker: {}:{}, input topic: {}, output topic: {}",
            config.host, config.port, config.input_topic, config.output_topic
        );
        Self { config }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    fn client_id(&self) -> String {
        format!("{}-{}", self.config.client_id_prefix, Uuid::new_v4().simple())
    }

    /// Process messages until `shutdown` resolves.
    ///
    /// Messages are handled one at a time on this task. On shutdown the
    /// in-flight message finishes, the final statistics are logged, and the
    /// client disconnects.
    pub async fn run<S, F>(&self, processor: &DrivingBehaviorProcessor<S>, shutdown: F)
    where
        S: StateStore,
        F: Future<Output = ()>,
    {
        let mut options = MqttOptions::new(self.client_id(), &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));

        let (client, mut eventloop) = AsyncClient::new(options, self.config.channel_capacity);
        let reconnect_delay = Duration::from_secs(self.config.reconnect_delay_secs);

        info!("Starting MQTT driving behavior processor");
        tokio::pin!(shutdown);

        // Set on every ConnAck, cleared once the SUBSCRIBE is queued
        let mut subscribe_pending = false;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                            if ack.code == ConnectReturnCode::Success {
                                info!("Connected to MQTT broker {}:{}", self.config.host, self.config.port);
                                subscribe_pending = true;
                            } else {
                                error!("Broker refused connection: {:?}", ack.code);
                            }
                        }
                        Ok(Event::Incoming(Packet::SubAck(ack))) => {
                            info!("Subscribed (pkid={}, return codes={:?})", ack.pkid, ack.return_codes);
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            route_message(
                                processor,
                                &client,
                                &self.config.output_topic,
                                &publish.topic,
                                &publish.payload,
                            );
                        }
                        Ok(event) => debug!("MQTT event: {:?}", event),
                        Err(e) => {
                            error!("MQTT connection error: {}", e);
                            sleep(reconnect_delay).await;
                        }
                    }

                    if subscribe_pending {
                        subscribe_pending = !self.request_subscription(&client);
                    }
                }
            }
        }

        match processor.summary() {
            Ok(summary) => summary.log(),
            Err(e) => warn!("Final statistics unavailable: {}", e),
        }

        self.disconnect(&client, &mut eventloop).await;
        info!("MQTT processor stopped gracefully");
    }

    /// Queue the input subscription; false when the request could not be
    /// queued and should be retried after the next event.
    fn request_subscription(&self, client: &AsyncClient) -> bool {
        match client.try_subscribe(self.config.input_topic.as_str(), QoS::AtMostOnce) {
            Ok(()) => {
                info!("Subscribe request sent to '{}'", self.config.input_topic);
                true
            }
            Err(e) => {
                error!("{}, retrying", BridgeError::Subscribe(e.to_string()));
                false
            }
        }
    }

    async fn disconnect(&self, client: &AsyncClient, eventloop: &mut EventLoop) {
        if let Err(e) = client.disconnect().await {
            warn!("Disconnect request failed: {}", e);
            return;
        }

        let drained = timeout(DISCONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Timed out waiting for broker disconnect");
        }
    }
}
