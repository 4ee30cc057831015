//! Batch event publication with a self-healing Kafka writer.

use crate::domain::BatchEvent;
use crate::fabric::{self, PRODUCE_TIMEOUT};
use crate::{ColdchainError, Result};
use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// How long a rebuilt writer settles before the retry send.
const RECOVERY_WAIT: Duration = Duration::from_secs(2);

/// Error fragments the broker reports when the output topic (or one of
/// its partitions) does not exist yet. Matched case-insensitively.
const TOPIC_MISSING_MARKERS: &[&str] = &[
    "[3] unknown topic or partition",
    "unknowntopicorpartition",
    "unknown topic or partition",
    "topic or partition that does not exist",
];

/// Whether an error message indicates a missing topic or partition.
pub(crate) fn is_topic_missing(error: &str) -> bool {
    let lower = error.to_lowercase();
    TOPIC_MISSING_MARKERS.iter().any(|m| lower.contains(m))
}

/// Sink for batch lifecycle events.
#[async_trait]
pub trait BatchEventPublisher: Send + Sync + 'static {
    /// Publish one event, keyed by batch id.
    async fn publish(&self, event: &BatchEvent) -> Result<()>;
}

/// Writer lifecycle of the self-healing publisher:
///
/// ```text
/// Ready --(send ok)--------------------> Ready
/// Ready --(send fails, topic missing)--> Rebuilding --(fresh writer, 2s)--> Ready
/// ```
///
/// Any other send failure stays in `Ready` and propagates to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Ready,
    Rebuilding,
}

/// Publishes batch events to Kafka, keyed by batch id, with message
/// headers for routing-free filtering.
///
/// A send rejected with "unknown topic or partition" drops the writer,
/// rebuilds one with identical configuration, waits out
/// [`RECOVERY_WAIT`] and retries the same message exactly once. Any
/// other failure is returned to the caller, which logs it without
/// rolling back the aggregate mutation.
pub struct KafkaBatchEventPublisher {
    brokers: String,
    topic: String,
    writer: RwLock<FutureProducer>,
    state: Mutex<WriterState>,
}

impl KafkaBatchEventPublisher {
    /// Build the publisher and its initial writer.
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let writer = fabric::create_producer(brokers)?;
        Ok(Self {
            brokers: brokers.to_string(),
            topic: topic.to_string(),
            writer: RwLock::new(writer),
            state: Mutex::new(WriterState::Ready),
        })
    }

    async fn send_once(&self, event: &BatchEvent, payload: &[u8]) -> std::result::Result<(), String> {
        let timestamp = fabric::rfc3339(event.timestamp);
        let mut headers = OwnedHeaders::new()
            .insert(Header {
                key: "event_type",
                value: Some(event.event_type.as_str()),
            })
            .insert(Header {
                key: "batch_id",
                value: Some(event.batch_id.as_str()),
            })
            .insert(Header {
                key: "product_id",
                value: Some(event.product_id.as_str()),
            });
        if let Some(order_id) = &event.order_id {
            headers = headers.insert(Header {
                key: "order_id",
                value: Some(order_id.as_str()),
            });
        }
        headers = headers.insert(Header {
            key: "timestamp",
            value: Some(timestamp.as_str()),
        });

        let record = FutureRecord::to(&self.topic)
            .key(&event.batch_id)
            .payload(payload)
            .headers(headers);

        let writer = self.writer.read().await.clone();
        writer
            .send(record, Timeout::After(PRODUCE_TIMEOUT))
            .await
            .map(|_| ())
            .map_err(|(e, _)| e.to_string())
    }

    /// Replace the writer with a fresh one built from the same
    /// configuration.
    async fn rebuild_writer(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            *state = WriterState::Rebuilding;
        }
        warn!(topic = %self.topic, "batch event writer rebuilding");

        let fresh = fabric::create_producer(&self.brokers)?;
        *self.writer.write().await = fresh;
        tokio::time::sleep(RECOVERY_WAIT).await;

        {
            let mut state = self.state.lock().await;
            *state = WriterState::Ready;
        }
        info!(topic = %self.topic, "batch event writer ready");
        Ok(())
    }
}

#[async_trait]
impl BatchEventPublisher for KafkaBatchEventPublisher {
    async fn publish(&self, event: &BatchEvent) -> Result<()> {
        let payload = fabric::encode(event)?;

        match self.send_once(event, &payload).await {
            Ok(()) => Ok(()),
            Err(error) if is_topic_missing(&error) => {
                warn!(
                    error = %error,
                    topic = %self.topic,
                    "topic missing, recovering writer and retrying once"
                );
                self.rebuild_writer().await?;
                self.send_once(event, &payload).await.map_err(|e| {
                    ColdchainError::Publish(format!("retry after writer rebuild failed: {e}"))
                })
            }
            Err(error) => Err(ColdchainError::Publish(error)),
        }
    }
}
