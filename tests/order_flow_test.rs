//! Damage-to-order scenarios, driven from raw queue payloads the way
//! the damage consumer drives the aggregator.

use async_trait::async_trait;
use chrono::Utc;
use coldchain::domain::{order_status, DamageEvent, OrderEvent, SensorReading, Severity};
use coldchain::orders::{DamageDelivery, OrderAggregator, OrderEventPublisher};
use coldchain::repository::InMemoryOrderRepository;
use coldchain::Result;
use pretty_assertions::assert_eq;
use std::sync::Arc;
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

fn reading(id: &str, temperature: f64, humidity: f64) -> SensorReading {
    SensorReading {
        id: id.into(),
        timestamp: Utc::now(),
        source: "sensor-sim-1".into(),
        temperature,
        humidity,
        status: "active".into(),
    }
}

fn setup() -> (OrderAggregator, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let aggregator = OrderAggregator::new(
        Arc::new(InMemoryOrderRepository::new()),
        publisher.clone(),
    );
    (aggregator, publisher)
}

#[tokio::test]
async fn cold_reading_becomes_a_minor_damage_order() {
    let (aggregator, publisher) = setup();

    // The detector's wire payload, decoded the way the queue consumer
    // decodes it.
    let damage = DamageEvent::from_reading(&reading("evt_1", 9.23, 58.0), "detector", "events/sensor");
    let payload = serde_json::to_vec(&damage).unwrap();
    let decoded = DamageDelivery::decode(&payload).unwrap();

    let order = aggregator.handle_damage(&decoded).await.unwrap();
    assert_eq!(order.id, "evt_1");
    assert_eq!(order.status, order_status::DAMAGE_DETECTED_MINOR);

    let events = publisher.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, OrderEvent::DAMAGE_PROCESSED);
    assert_eq!(events[0].order_id, "evt_1");
    assert_eq!(events[0].order.status, order_status::DAMAGE_DETECTED_MINOR);
}

#[tokio::test]
async fn hot_reading_cancels_the_order() {
    let (aggregator, _) = setup();

    let damage = DamageEvent::from_reading(&reading("evt_2", 45.0, 95.0), "detector", "events/sensor");
    assert_eq!(damage.severity, Severity::Critical);

    let order = aggregator.handle_damage(&damage).await.unwrap();
    assert_eq!(order.status, order_status::CANCELLED_DAMAGE);
}

#[tokio::test]
async fn wrapped_bridge_payloads_reach_the_aggregator() {
    let (aggregator, _) = setup();

    let damage = DamageEvent::from_reading(&reading("evt_3", 31.0, 50.0), "detector", "events/sensor");
    let wrapper = serde_json::json!({
        "mqttTopic": "events/order-damage",
        "payload": serde_json::to_string(&damage).unwrap(),
        "timestamp": Utc::now(),
    });

    let decoded = DamageDelivery::decode(&serde_json::to_vec(&wrapper).unwrap()).unwrap();
    let order = aggregator.handle_damage(&decoded).await.unwrap();
    assert_eq!(order.status, order_status::DAMAGE_DETECTED_MAJOR);
}

#[tokio::test]
async fn unknown_severity_lands_in_the_unknown_status() {
    let (aggregator, _) = setup();

    // Foreign producer with a severity this pipeline does not grade.
    let payload = serde_json::json!({
        "eventId": "evt_4",
        "type": "order.damage",
        "source": "legacy-detector",
        "occurredAt": Utc::now(),
        "orderId": "evt_4",
        "severity": "catastrophic",
        "description": "legacy damage",
        "details": {
            "temperature": 1.0,
            "humidity": 50.0,
            "status": "active",
            "sourceTopic": "events/sensor"
        }
    });

    let decoded = DamageDelivery::decode(&serde_json::to_vec(&payload).unwrap()).unwrap();
    assert_eq!(decoded.severity, Severity::Unknown);

    let order = aggregator.handle_damage(&decoded).await.unwrap();
    assert_eq!(order.status, order_status::DAMAGE_DETECTED_UNKNOWN);
}

#[tokio::test]
async fn repeated_damage_is_idempotent_up_to_timestamps() {
    let (aggregator, publisher) = setup();

    let damage = DamageEvent::from_reading(&reading("evt_5", 5.0, 50.0), "detector", "events/sensor");
    let first = aggregator.handle_damage(&damage).await.unwrap();
    let second = aggregator.handle_damage(&damage).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.status, second.status);
    assert_eq!(first.created_at, second.created_at);
    // Redelivery produces another event; consumers key by order id.
    assert_eq!(publisher.events.lock().await.len(), 2);
}
