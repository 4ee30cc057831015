//! Kafka consumer feeding the batch aggregator.

use crate::domain::OrderEvent;
use crate::fabric;
use crate::shutdown::Shutdown;
use crate::warehouse::BatchAggregator;
use crate::{ColdchainError, Result};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::Message;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Poll window per read; expiry is not an error, the loop just polls
/// again.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Consumes order lifecycle events and drives the batch aggregator.
///
/// Offsets are committed after each handled delivery. Poison payloads
/// and domain rule violations are committed too (skipping them), so a
/// bad record can never block the partition head; only transport-level
/// handler failures leave the offset uncommitted for redelivery.
pub struct OrderEventConsumer {
    consumer: StreamConsumer,
    aggregator: Arc<BatchAggregator>,
}

impl OrderEventConsumer {
    /// Wrap a subscribed consumer and the aggregator it feeds.
    pub fn new(consumer: StreamConsumer, aggregator: Arc<BatchAggregator>) -> Self {
        Self {
            consumer,
            aggregator,
        }
    }

    /// Consume until shutdown.
    pub async fn run(&self, shutdown: Shutdown) -> Result<()> {
        info!("order event consumer started");

        loop {
            tokio::select! {
                _ = shutdown.triggered() => {
                    info!("order event consumer stopping");
                    return Ok(());
                }
                polled = tokio::time::timeout(READ_TIMEOUT, self.consumer.recv()) => match polled {
                    Err(_) => {
                        // Idle poll window, nothing to read.
                        continue;
                    }
                    Ok(Err(e)) => {
                        error!(error = %e, "kafka read error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    Ok(Ok(message)) => {
                        let _guard = shutdown.begin_delivery();
                        if self.process(&message).await {
                            if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                                error!(error = %e, "offset commit failed");
                            }
                        }
                    }
                }
            }
        }
    }

    /// Handle one record, returning whether its offset should be
    /// committed.
    async fn process(&self, message: &BorrowedMessage<'_>) -> bool {
        let Some(payload) = message.payload() else {
            warn!(
                offset = message.offset(),
                partition = message.partition(),
                "empty payload, skipping"
            );
            return true;
        };

        let event: OrderEvent = match fabric::decode(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    error = %e,
                    offset = message.offset(),
                    "poison record, skipping"
                );
                return true;
            }
        };

        match self.aggregator.handle_order_event(&event).await {
            Ok(()) => true,
            Err(ColdchainError::Domain(e)) => {
                // Redelivery cannot repair a rule violation; skip it so
                // the partition head keeps moving.
                warn!(
                    error = %e,
                    order_id = %event.order_id,
                    event_type = %event.event_type,
                    "domain rule rejected event, skipping"
                );
                true
            }
            Err(e) => {
                error!(
                    error = %e,
                    order_id = %event.order_id,
                    "handler failed, leaving offset uncommitted"
                );
                false
            }
        }
    }
}
