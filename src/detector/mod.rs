//! The damage detector: MQTT sensor ingest, threshold rule, dual-sink
//! damage event emission.

mod thresholds;

pub use thresholds::{TemperatureRange, Thresholds};

use crate::config::DetectorConfig;
use crate::domain::{DamageEvent, SensorReading};
use crate::fabric;
use crate::shutdown::Shutdown;
use crate::{ColdchainError, Result};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// MQTT keepalive interval.
const KEEPALIVE: Duration = Duration::from_secs(30);

/// Delay before repolling after an MQTT connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Per-publish timeout applied to each damage sink.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the rumqttc request channel.
const MQTT_QUEUE_CAPACITY: usize = 16;

/// Consumes sensor readings and emits damage events.
///
/// The detector holds no retry state of its own: the MQTT session is
/// clean (un-ACKed messages may be redelivered by the broker) and the
/// event loop simply repolls after connection errors.
pub struct DamageDetector {
    config: DetectorConfig,
    thresholds: Arc<Thresholds>,
    producer: FutureProducer,
}

impl DamageDetector {
    /// Build a detector and its Kafka mirror producer.
    pub fn new(config: DetectorConfig, thresholds: Arc<Thresholds>) -> Result<Self> {
        let producer = fabric::create_producer(&config.kafka_brokers)?;
        Ok(Self {
            config,
            thresholds,
            producer,
        })
    }

    /// Run the MQTT loop until shutdown.
    ///
    /// The initial subscribe failing is a startup error; everything
    /// after that is logged and survived.
    pub async fn run(&self, shutdown: Shutdown) -> Result<()> {
        let mut options = MqttOptions::new(
            &self.config.mqtt_client_id,
            &self.config.mqtt_host,
            self.config.mqtt_port,
        );
        options.set_keep_alive(KEEPALIVE);
        options.set_clean_session(true);
        if let (Some(user), Some(pass)) = (&self.config.mqtt_username, &self.config.mqtt_password) {
            options.set_credentials(user, pass);
        }

        let (client, mut eventloop) = AsyncClient::new(options, MQTT_QUEUE_CAPACITY);
        client
            .subscribe(&self.config.sensor_topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| ColdchainError::Transport(format!("initial subscribe failed: {e}")))?;

        info!(topic = %self.config.sensor_topic, "damage detector subscribed");

        loop {
            tokio::select! {
                _ = shutdown.triggered() => {
                    info!("damage detector stopping");
                    let _ = tokio::time::timeout(Duration::from_secs(2), client.disconnect()).await;
                    return Ok(());
                }
                polled = eventloop.poll() => match polled {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // Clean sessions drop subscriptions on reconnect,
                        // so every ConnAck needs a fresh subscribe.
                        if let Err(e) = client
                            .subscribe(&self.config.sensor_topic, QoS::AtLeastOnce)
                            .await
                        {
                            warn!(error = %e, "re-subscribe failed");
                        } else {
                            info!("connected to MQTT broker");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let _guard = shutdown.begin_delivery();
                        self.handle_payload(&client, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "MQTT connection error, repolling in {}s", RECONNECT_DELAY.as_secs());
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }
    }

    /// Decode one reading and emit damage events if it violates the
    /// configured range. Malformed payloads are dropped.
    async fn handle_payload(&self, client: &AsyncClient, payload: &[u8]) {
        let reading: SensorReading = match fabric::decode(payload) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "dropping malformed sensor reading");
                return;
            }
        };

        let range = self.thresholds.get().await;
        if !range.is_violated_by(reading.temperature) {
            debug!(id = %reading.id, temperature = reading.temperature, "reading within range");
            return;
        }

        let event = DamageEvent::from_reading(
            &reading,
            &self.config.mqtt_client_id,
            &self.config.sensor_topic,
        );
        info!(
            order_id = %event.order_id,
            severity = %event.severity,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "damage detected"
        );

        // Two independent sinks; partial success is logged, not retried.
        // Redelivery is the brokers' concern on both sides.
        self.publish_mqtt(client, &event).await;
        self.publish_kafka(&event).await;
    }

    async fn publish_mqtt(&self, client: &AsyncClient, event: &DamageEvent) {
        let payload = match fabric::encode(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "failed to encode damage event");
                return;
            }
        };
        let publish = client.publish(
            &self.config.damage_topic,
            QoS::AtLeastOnce,
            false,
            payload,
        );
        match tokio::time::timeout(PUBLISH_TIMEOUT, publish).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, topic = %self.config.damage_topic, "MQTT damage publish failed"),
            Err(_) => error!(topic = %self.config.damage_topic, "MQTT damage publish timed out"),
        }
    }

    async fn publish_kafka(&self, event: &DamageEvent) {
        let payload = match fabric::encode(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "failed to encode damage event");
                return;
            }
        };
        let record = FutureRecord::to(&self.config.kafka_damage_topic)
            .key(&event.order_id)
            .payload(&payload);
        if let Err((e, _)) = self
            .producer
            .send(record, Timeout::After(PUBLISH_TIMEOUT))
            .await
        {
            error!(error = %e, topic = %self.config.kafka_damage_topic, "Kafka damage publish failed");
        }
    }
}
