//! Queue-broker consumer feeding the order aggregator.

use crate::orders::{DamageDelivery, OrderAggregator};
use crate::shutdown::Shutdown;
use crate::{ColdchainError, Result};
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Consumer tag announced to the broker.
const CONSUMER_TAG: &str = "order-service";

/// Pulls damage deliveries off the queue and drives the aggregator.
///
/// Ack discipline: the delivery is positively acknowledged only after
/// the aggregator persisted the order and queued its lifecycle event.
/// Handler failures are requeued; undecodable payloads are dropped as
/// poison (nack without requeue).
pub struct DamageConsumer {
    aggregator: Arc<OrderAggregator>,
}

impl DamageConsumer {
    /// Wrap an aggregator.
    pub fn new(aggregator: Arc<OrderAggregator>) -> Self {
        Self { aggregator }
    }

    /// Declare the consumer's own topology. Idempotent, run on startup.
    pub async fn declare(
        channel: &Channel,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<()> {
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

        Ok(())
    }

    /// Consume until shutdown. One delivery is in flight at a time.
    pub async fn run(&self, channel: Channel, queue: &str, shutdown: Shutdown) -> Result<()> {
        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(|e| ColdchainError::Transport(format!("basic_qos failed: {e}")))?;

        let mut consumer = channel
            .basic_consume(
                queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| ColdchainError::Transport(format!("basic_consume failed: {e}")))?;

        info!(queue, "damage consumer started");

        loop {
            tokio::select! {
                _ = shutdown.triggered() => {
                    info!("damage consumer stopping");
                    return Ok(());
                }
                delivery = consumer.next() => match delivery {
                    Some(Ok(delivery)) => {
                        let _guard = shutdown.begin_delivery();
                        self.handle(delivery).await;
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "queue delivery error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    None => {
                        return Err(ColdchainError::Transport(
                            "damage consumer stream closed by broker".into(),
                        ));
                    }
                }
            }
        }
    }

    async fn handle(&self, delivery: Delivery) {
        let damage = match DamageDelivery::decode(&delivery.data) {
            Ok(damage) => damage,
            Err(e) => {
                warn!(error = %e, "poison delivery, dropping without requeue");
                self.nack(&delivery, false).await;
                return;
            }
        };

        match self.aggregator.handle_damage(&damage).await {
            Ok(_) => {
                if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                    error!(error = %e, order_id = %damage.order_id, "ack failed");
                }
            }
            Err(e) => {
                warn!(error = %e, order_id = %damage.order_id, "damage handling failed, requeueing");
                self.nack(&delivery, true).await;
            }
        }
    }

    async fn nack(&self, delivery: &Delivery, requeue: bool) {
        let options = BasicNackOptions {
            requeue,
            ..Default::default()
        };
        if let Err(e) = delivery.acker.nack(options).await {
            error!(error = %e, "nack failed");
        }
    }
}
