//! The Order aggregate owner.

use crate::domain::{DamageEvent, Order, OrderEvent};
use crate::error::DomainError;
use crate::orders::publisher::OrderEventPublisher;
use crate::repository::OrderRepository;
use crate::Result;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Applies damage events and API requests to the Order aggregate and
/// publishes a lifecycle event for every successful mutation.
///
/// Both the queue consumer and the HTTP API route through this type so
/// the aggregate's invariants hold regardless of the entry point.
pub struct OrderAggregator {
    repository: Arc<dyn OrderRepository>,
    publisher: Arc<dyn OrderEventPublisher>,
}

impl OrderAggregator {
    /// Wire an aggregator to its repository and event publisher.
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        publisher: Arc<dyn OrderEventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Apply a damage event, creating the order if it is unknown.
    ///
    /// The returned snapshot has already been persisted and its
    /// `order.damage_processed` event queued; the caller may ack the
    /// delivery once this returns.
    pub async fn handle_damage(&self, damage: &DamageEvent) -> Result<Order> {
        let mut order = match self.repository.find(&damage.order_id).await? {
            Some(order) => order,
            None => {
                info!(order_id = %damage.order_id, "synthesizing order for unknown damage target");
                Order::synthesized(&damage.order_id, damage.occurred_at)
            }
        };

        order.apply_damage(damage.severity);
        self.repository.save(order.clone()).await?;

        let event = OrderEvent::new(OrderEvent::DAMAGE_PROCESSED, order.clone());
        self.publisher.publish(&event).await?;

        info!(order_id = %order.id, status = %order.status, "damage processed");
        Ok(order)
    }

    /// Create an order through the API path.
    pub async fn create_order(
        &self,
        customer_id: String,
        product_id: String,
        quantity: u32,
        total_amount: f64,
    ) -> Result<Order> {
        let order = Order::new(
            Uuid::new_v4().to_string(),
            customer_id,
            product_id,
            quantity,
            total_amount,
        );
        self.repository.save(order.clone()).await?;

        let event = OrderEvent::new(OrderEvent::CREATED, order.clone());
        self.publisher.publish(&event).await?;
        Ok(order)
    }

    /// Update an order's status through the API path.
    pub async fn update_status(&self, id: &str, status: &str) -> Result<Order> {
        let mut order = self
            .repository
            .find(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                kind: "order",
                id: id.to_string(),
            })?;

        order.set_status(status);
        self.repository.save(order.clone()).await?;

        let event = OrderEvent::new(OrderEvent::UPDATED, order.clone());
        self.publisher.publish(&event).await?;
        Ok(order)
    }

    /// Snapshot a single order.
    pub async fn get(&self, id: &str) -> Result<Option<Order>> {
        self.repository.find(id).await
    }

    /// Snapshot all orders.
    pub async fn list(&self) -> Result<Vec<Order>> {
        self.repository.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{order_status, SensorReading, Severity};
    use crate::repository::InMemoryOrderRepository;
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<OrderEvent>>,
    }

    #[async_trait]
    impl OrderEventPublisher for RecordingPublisher {
        async fn publish(&self, event: &OrderEvent) -> Result<()> {
            self.events.lock().await.push(event.clone());
            Ok(())
        }
    }

    fn damage_event(id: &str, temperature: f64, humidity: f64) -> DamageEvent {
        let reading = SensorReading {
            id: id.into(),
            timestamp: Utc::now(),
            source: "sensor-sim-1".into(),
            temperature,
            humidity,
            status: "active".into(),
        };
        DamageEvent::from_reading(&reading, "detector", "events/sensor")
    }

    fn aggregator() -> (OrderAggregator, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let aggregator = OrderAggregator::new(
            Arc::new(InMemoryOrderRepository::new()),
            publisher.clone(),
        );
        (aggregator, publisher)
    }

    #[tokio::test]
    async fn damage_on_unknown_order_synthesizes_it() {
        let (aggregator, publisher) = aggregator();
        let damage = damage_event("evt_1", 9.23, 58.0);
        assert_eq!(damage.severity, Severity::Minor);

        let order = aggregator.handle_damage(&damage).await.unwrap();
        assert_eq!(order.id, "evt_1");
        assert_eq!(order.customer_id, "unknown");
        assert_eq!(order.status, order_status::DAMAGE_DETECTED_MINOR);
        assert_eq!(order.created_at, damage.occurred_at);

        let events = publisher.events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, OrderEvent::DAMAGE_PROCESSED);
        assert_eq!(events[0].order.status, order_status::DAMAGE_DETECTED_MINOR);
    }

    #[tokio::test]
    async fn critical_damage_cancels_the_order() {
        let (aggregator, _) = aggregator();
        let order = aggregator
            .handle_damage(&damage_event("evt_2", 45.0, 95.0))
            .await
            .unwrap();
        assert_eq!(order.status, order_status::CANCELLED_DAMAGE);
    }

    #[tokio::test]
    async fn damage_on_existing_order_keeps_its_fields() {
        let (aggregator, publisher) = aggregator();
        let created = aggregator
            .create_order("c-1".into(), "p-1".into(), 3, 42.0)
            .await
            .unwrap();

        let mut damage = damage_event("ignored", 31.0, 50.0);
        damage.order_id = created.id.clone();

        let updated = aggregator.handle_damage(&damage).await.unwrap();
        assert_eq!(updated.customer_id, "c-1");
        assert_eq!(updated.product_id, "p-1");
        assert_eq!(updated.status, order_status::DAMAGE_DETECTED_MAJOR);

        let events = publisher.events.lock().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, OrderEvent::CREATED);
        assert_eq!(events[1].event_type, OrderEvent::DAMAGE_PROCESSED);
    }

    #[tokio::test]
    async fn status_update_requires_existing_order() {
        let (aggregator, _) = aggregator();
        let err = aggregator.update_status("missing", "shipped").await.unwrap_err();
        assert!(matches!(
            err,
            crate::ColdchainError::Domain(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn api_create_then_update_emits_lifecycle_events() {
        let (aggregator, publisher) = aggregator();
        let order = aggregator
            .create_order("c-1".into(), "p-1".into(), 1, 10.0)
            .await
            .unwrap();
        assert_eq!(order.status, order_status::PENDING);

        let updated = aggregator.update_status(&order.id, "shipped").await.unwrap();
        assert_eq!(updated.status, "shipped");

        let events = publisher.events.lock().await;
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec![OrderEvent::CREATED, OrderEvent::UPDATED]);
    }
}
