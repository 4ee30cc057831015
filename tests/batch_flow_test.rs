//! End-to-end scenarios for the batch aggregator, driven the way the
//! Kafka consumer drives it, with the publisher stubbed out.

use async_trait::async_trait;
use coldchain::domain::{
    order_status, Batch, BatchEvent, BatchStatus, Order, OrderEvent,
};
use coldchain::error::DomainError;
use coldchain::repository::{BatchRepository, InMemoryBatchRepository};
use coldchain::warehouse::{BatchAggregator, BatchEventPublisher};
use coldchain::{ColdchainError, Result};
use chrono::Utc;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<BatchEvent>>,
}

#[async_trait]
impl BatchEventPublisher for RecordingPublisher {
    async fn publish(&self, event: &BatchEvent) -> Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

impl RecordingPublisher {
    async fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

/// Publisher that always fails, for checking that event emission never
/// rolls back an aggregate mutation.
struct BrokenPublisher;

#[async_trait]
impl BatchEventPublisher for BrokenPublisher {
    async fn publish(&self, _event: &BatchEvent) -> Result<()> {
        Err(ColdchainError::Publish("writer is down".into()))
    }
}

fn order(id: &str, product_id: &str, status: &str) -> Order {
    let mut order = Order::new(id.into(), "c-1".into(), product_id.into(), 1, 10.0);
    order.set_status(status);
    order
}

fn event(event_type: &str, order: Order) -> OrderEvent {
    OrderEvent::new(event_type, order)
}

fn setup() -> (
    Arc<InMemoryBatchRepository>,
    Arc<RecordingPublisher>,
    BatchAggregator,
) {
    let repository = Arc::new(InMemoryBatchRepository::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let aggregator = BatchAggregator::new(repository.clone(), publisher.clone());
    (repository, publisher, aggregator)
}

#[tokio::test]
async fn two_orders_for_one_product_share_a_single_pending_batch() {
    let (repository, publisher, aggregator) = setup();

    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();
    aggregator
        .handle_order_event(&event("order.created", order("o2", "p1", "pending")))
        .await
        .unwrap();

    let pending = repository.find_pending_by_product("p1").await.unwrap().unwrap();
    assert_eq!(pending.total_items, 2);
    assert!(pending.contains_order("o1"));
    assert!(pending.contains_order("o2"));
    assert_eq!(repository.list().await.unwrap().len(), 1);

    assert_eq!(
        publisher.event_types().await,
        vec!["batch.created", "batch.item_added", "batch.item_added"]
    );
}

#[tokio::test]
async fn releasing_the_sole_order_deletes_the_batch() {
    let (repository, publisher, aggregator) = setup();

    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();
    aggregator
        .handle_order_event(&event("order.cancelled", order("o1", "p1", "cancelled")))
        .await
        .unwrap();

    assert!(repository.find_by_product("p1").await.unwrap().is_empty());
    assert_eq!(
        publisher.event_types().await,
        vec!["batch.created", "batch.item_added", "batch.item_removed"]
    );
}

#[tokio::test]
async fn minor_damage_on_unknown_order_creates_a_batch() {
    let (repository, publisher, aggregator) = setup();

    // The damage path synthesizes orders with product "unknown".
    let mut damaged = Order::synthesized("evt_1", Utc::now());
    damaged.set_status(order_status::DAMAGE_DETECTED_MINOR);

    aggregator
        .handle_order_event(&event("order.damage_processed", damaged))
        .await
        .unwrap();

    let batch = repository.find_by_order("evt_1").await.unwrap().unwrap();
    assert!(batch.id.starts_with("BATCH-unknown-"));
    assert_eq!(batch.status, BatchStatus::Pending);
    assert_eq!(batch.item("evt_1").unwrap().status, "damage_minor");

    assert_eq!(
        publisher.event_types().await,
        vec!["batch.created", "batch.item_added"]
    );
}

#[tokio::test]
async fn major_damage_marks_the_containing_batch_damaged() {
    let (repository, publisher, aggregator) = setup();

    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();

    aggregator
        .handle_order_event(&event(
            "order.damage_processed",
            order("o1", "p1", order_status::DAMAGE_DETECTED_MAJOR),
        ))
        .await
        .unwrap();

    let batch = repository.find_by_order("o1").await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Damaged);
    assert_eq!(batch.item("o1").unwrap().status, "damage_major");

    assert_eq!(
        publisher.event_types().await,
        vec![
            "batch.created",
            "batch.item_added",
            "batch.item_updated",
            "batch.marked_damaged"
        ]
    );
}

#[tokio::test]
async fn unmapped_damage_statuses_mutate_nothing() {
    let (repository, publisher, aggregator) = setup();

    // A critical severity upstream leaves the order cancelled_damage,
    // which has no damage sub-rule: log and move on.
    let mut cancelled = Order::synthesized("evt_2", Utc::now());
    cancelled.set_status(order_status::CANCELLED_DAMAGE);

    aggregator
        .handle_order_event(&event("order.damage_processed", cancelled))
        .await
        .unwrap();

    assert!(repository.list().await.unwrap().is_empty());
    assert!(publisher.event_types().await.is_empty());
}

#[tokio::test]
async fn adding_the_same_order_twice_is_idempotent() {
    let (repository, publisher, aggregator) = setup();

    let first = event("order.created", order("o1", "p1", "pending"));
    aggregator.handle_order_event(&first).await.unwrap();
    aggregator.handle_order_event(&first).await.unwrap();

    let batch = repository.find_pending_by_product("p1").await.unwrap().unwrap();
    assert_eq!(batch.total_items, 1);
    assert_eq!(batch.item("o1").unwrap().status, "allocated");

    assert_eq!(
        publisher.event_types().await,
        vec!["batch.created", "batch.item_added", "batch.item_updated"]
    );
}

#[tokio::test]
async fn shipping_and_delivery_update_the_item() {
    let (repository, _, aggregator) = setup();

    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();
    aggregator
        .handle_order_event(&event("order.shipped", order("o1", "p1", "shipped")))
        .await
        .unwrap();

    let batch = repository.find_by_order("o1").await.unwrap().unwrap();
    let item = batch.item("o1").unwrap();
    assert_eq!(item.status, "shipped");
    assert!(item.processed_at.is_some());

    aggregator
        .handle_order_event(&event("order.delivered", order("o1", "p1", "delivered")))
        .await
        .unwrap();
    let batch = repository.find_by_order("o1").await.unwrap().unwrap();
    assert_eq!(batch.item("o1").unwrap().status, "delivered");
}

#[tokio::test]
async fn a_return_appends_a_sibling_item() {
    let (repository, publisher, aggregator) = setup();

    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();
    aggregator
        .handle_order_event(&event("order.returned", order("o1", "p1", "returned")))
        .await
        .unwrap();

    let batch = repository.find_by_order("o1").await.unwrap().unwrap();
    assert_eq!(batch.total_items, 2);
    assert_eq!(batch.item("o1").unwrap().status, "returned");
    assert_eq!(batch.item("o1-return").unwrap().status, "returned");

    assert_eq!(
        publisher.event_types().await,
        vec![
            "batch.created",
            "batch.item_added",
            "batch.item_updated",
            "batch.item_added"
        ]
    );
}

#[tokio::test]
async fn allocation_and_release_confirmations_update_items() {
    let (repository, _, aggregator) = setup();

    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();
    aggregator
        .handle_order_event(&event("order.inventory_allocated", order("o1", "p1", "pending")))
        .await
        .unwrap();
    let batch = repository.find_by_order("o1").await.unwrap().unwrap();
    assert_eq!(batch.item("o1").unwrap().status, "allocation_confirmed");

    aggregator
        .handle_order_event(&event("order.inventory_released", order("o1", "p1", "pending")))
        .await
        .unwrap();
    let batch = repository.find_by_order("o1").await.unwrap().unwrap();
    assert_eq!(batch.item("o1").unwrap().status, "release_confirmed");
}

#[tokio::test]
async fn event_types_outside_the_mapping_are_skipped() {
    let (repository, publisher, aggregator) = setup();

    aggregator
        .handle_order_event(&event("order.updated", order("o1", "p1", "shipped")))
        .await
        .unwrap();

    assert!(repository.list().await.unwrap().is_empty());
    assert!(publisher.event_types().await.is_empty());
}

#[tokio::test]
async fn lifecycle_transitions_emit_their_events() {
    let (_, publisher, aggregator) = setup();

    let batch = aggregator
        .add_order_to_batch(&order("o1", "p1", "pending"), "allocated")
        .await
        .unwrap();

    let batch = aggregator.start_processing(&batch.id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Processing);
    assert!(batch.processed_at.is_some());

    let batch = aggregator.complete(&batch.id).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);

    assert_eq!(
        publisher.event_types().await,
        vec![
            "batch.created",
            "batch.item_added",
            "batch.processing_started",
            "batch.completed"
        ]
    );
}

#[tokio::test]
async fn illegal_transitions_surface_domain_errors() {
    let (_, _, aggregator) = setup();

    let batch = aggregator
        .add_order_to_batch(&order("o1", "p1", "pending"), "allocated")
        .await
        .unwrap();

    let err = aggregator.complete(&batch.id).await.unwrap_err();
    assert!(matches!(
        err,
        ColdchainError::Domain(DomainError::IllegalTransition { .. })
    ));

    let err = aggregator.mark_damaged("no-such-batch").await.unwrap_err();
    assert!(matches!(
        err,
        ColdchainError::Domain(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn publish_failures_do_not_roll_back_mutations() {
    let repository = Arc::new(InMemoryBatchRepository::new());
    let aggregator = BatchAggregator::new(repository.clone(), Arc::new(BrokenPublisher));

    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();

    let batch = repository.find_pending_by_product("p1").await.unwrap().unwrap();
    assert!(batch.contains_order("o1"));
}

fn assert_invariants(batches: &[Batch]) {
    for batch in batches {
        assert_eq!(batch.total_items, batch.items.len(), "count invariant on {}", batch.id);
        for item in &batch.items {
            assert_eq!(item.product_id, batch.product_id, "product invariant on {}", batch.id);
        }
    }
    for product in batches.iter().map(|b| b.product_id.clone()) {
        let pending = batches
            .iter()
            .filter(|b| b.product_id == product && b.status == BatchStatus::Pending)
            .count();
        assert!(pending <= 1, "more than one pending batch for {product}");
    }
}

#[tokio::test]
async fn invariants_hold_across_a_mixed_event_sequence() {
    let (repository, _, aggregator) = setup();

    let sequence = vec![
        event("order.created", order("o1", "p1", "pending")),
        event("order.created", order("o2", "p1", "pending")),
        event("order.created", order("o3", "p2", "pending")),
        event("order.shipped", order("o1", "p1", "shipped")),
        event("order.cancelled", order("o2", "p1", "cancelled")),
        event("order.returned", order("o3", "p2", "returned")),
        event(
            "order.damage_processed",
            order("o4", "p3", order_status::DAMAGE_DETECTED_MAJOR),
        ),
        event("order.created", order("o5", "p3", "pending")),
    ];

    for event in &sequence {
        aggregator.handle_order_event(event).await.unwrap();
    }

    let batches = repository.list().await.unwrap();
    assert_invariants(&batches);

    // p3's first batch is damaged, so o5 opened a fresh pending one.
    let p3 = repository.find_by_product("p3").await.unwrap();
    assert_eq!(p3.len(), 2);
    assert!(p3.iter().any(|b| b.status == BatchStatus::Damaged));
    assert!(p3.iter().any(|b| b.status == BatchStatus::Pending));
}

async fn run_replay_sequence(aggregator: &BatchAggregator) {
    aggregator
        .handle_order_event(&event("order.created", order("o1", "p1", "pending")))
        .await
        .unwrap();
    aggregator
        .handle_order_event(&event("order.created", order("o2", "p1", "pending")))
        .await
        .unwrap();
    aggregator
        .handle_order_event(&event("order.shipped", order("o1", "p1", "shipped")))
        .await
        .unwrap();
}

#[tokio::test]
async fn replaying_a_sequence_gives_an_equivalent_batch() {
    let (repo_a, _, aggregator_a) = setup();
    run_replay_sequence(&aggregator_a).await;
    let (repo_b, _, aggregator_b) = setup();
    run_replay_sequence(&aggregator_b).await;

    let a = &repo_a.list().await.unwrap()[0];
    let b = &repo_b.list().await.unwrap()[0];

    // Equal up to wall-clock fields: same structure, statuses, order.
    assert_eq!(a.product_id, b.product_id);
    assert_eq!(a.status, b.status);
    assert_eq!(a.total_items, b.total_items);
    let statuses =
        |batch: &Batch| batch.items.iter().map(|i| (i.order_id.clone(), i.status.clone())).collect::<Vec<_>>();
    assert_eq!(statuses(a), statuses(b));
}
