//! Order lifecycle event publication onto the queue broker.

use crate::domain::OrderEvent;
use crate::fabric;
use crate::{ColdchainError, Result};
use async_trait::async_trait;
use lapin::options::{
    BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, ExchangeKind};
use tracing::info;

/// Sink for order lifecycle events.
///
/// The aggregator only publishes through this trait, which keeps the
/// broker out of the aggregate tests.
#[async_trait]
pub trait OrderEventPublisher: Send + Sync + 'static {
    /// Queue one event, returning once the broker confirmed it.
    async fn publish(&self, event: &OrderEvent) -> Result<()>;
}

/// Publishes order events to a durable queue via the direct exchange.
pub struct AmqpOrderEventPublisher {
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl AmqpOrderEventPublisher {
    /// Declare the exchange, queue and binding and enable publisher
    /// confirms. All declarations are idempotent; running them on every
    /// startup is the topology contract of the pipeline.
    pub async fn declare(
        channel: Channel,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<Self> {
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| ColdchainError::Transport(format!("confirm_select failed: {e}")))?;

        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ColdchainError::Transport(format!("exchange declare failed: {e}")))?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ColdchainError::Transport(format!("queue declare failed: {e}")))?;

        channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| ColdchainError::Transport(format!("queue bind failed: {e}")))?;

        info!(exchange, queue, routing_key, "publisher topology declared");

        Ok(Self {
            channel,
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        })
    }
}

#[async_trait]
impl OrderEventPublisher for AmqpOrderEventPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<()> {
        let payload = fabric::encode(event)?;

        let confirm = self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2), // persistent
            )
            .await
            .map_err(|e| ColdchainError::Publish(format!("basic_publish failed: {e}")))?
            .await
            .map_err(|e| ColdchainError::Publish(format!("publish confirm failed: {e}")))?;

        if confirm.is_nack() {
            return Err(ColdchainError::Publish(format!(
                "broker nacked {} for order {}",
                event.event_type, event.order_id
            )));
        }
        Ok(())
    }
}
