//! Kafka client construction with the pipeline's delivery discipline.

use crate::{ColdchainError, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;
use std::time::Duration;

/// Synchronous produce timeout applied to every Kafka send.
pub const PRODUCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a producer acknowledged by at least one in-sync replica.
pub fn create_producer(brokers: &str) -> Result<FutureProducer> {
    ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("acks", "1")
        .set("message.timeout.ms", "10000")
        .set("request.timeout.ms", "10000")
        .create()
        .map_err(|e| ColdchainError::Transport(format!("failed to create producer: {e}")))
}

/// Create a manual-commit consumer subscribed to a single topic.
///
/// Offsets are committed by the consumer loop after each handled
/// delivery; on restart the group resumes from the last committed
/// offset (`auto.offset.reset=earliest` covers the first run).
pub fn create_consumer(brokers: &str, group_id: &str, topic: &str) -> Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", "30000")
        .create()
        .map_err(|e| ColdchainError::Transport(format!("failed to create consumer: {e}")))?;

    consumer
        .subscribe(&[topic])
        .map_err(|e| ColdchainError::Transport(format!("failed to subscribe to {topic}: {e}")))?;

    Ok(consumer)
}
