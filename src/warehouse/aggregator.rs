//! The Batch aggregate owner.

use crate::domain::{
    item_status, order_status, Batch, BatchEvent, BatchStatus, ItemChange, Order, OrderEvent,
};
use crate::error::DomainError;
use crate::repository::BatchRepository;
use crate::warehouse::actions::WarehouseAction;
use crate::warehouse::publisher::BatchEventPublisher;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Applies order lifecycle events to the Batch aggregate and publishes
/// a batch event for every successful mutation.
///
/// Event emission is fire-and-log: by the time an event is published
/// the mutation has already been persisted, so a publish failure never
/// rolls the aggregate back.
pub struct BatchAggregator {
    repository: Arc<dyn BatchRepository>,
    publisher: Arc<dyn BatchEventPublisher>,
}

impl BatchAggregator {
    /// Wire an aggregator to its repository and event publisher.
    pub fn new(
        repository: Arc<dyn BatchRepository>,
        publisher: Arc<dyn BatchEventPublisher>,
    ) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Dispatch one order lifecycle event.
    ///
    /// Unknown event types are skipped. Domain errors bubble up so the
    /// consumer can log and acknowledge them.
    pub async fn handle_order_event(&self, event: &OrderEvent) -> Result<()> {
        let Some(action) = WarehouseAction::from_event_type(&event.event_type) else {
            debug!(event_type = %event.event_type, "no warehouse action, skipping");
            return Ok(());
        };

        debug!(
            action = %action,
            order_id = %event.order_id,
            "applying warehouse action"
        );

        match action {
            WarehouseAction::AllocateInventory => {
                self.add_order_to_batch(&event.order, item_status::ALLOCATED)
                    .await
                    .map(|_| ())
            }
            WarehouseAction::ReleaseInventory => self.remove_order_from_batch(&event.order_id).await,
            WarehouseAction::UpdateInventory => {
                self.update_item(&event.order_id, item_status::SHIPPED).await
            }
            WarehouseAction::ConfirmDelivery => {
                self.update_item(&event.order_id, item_status::DELIVERED).await
            }
            WarehouseAction::ProcessReturn => self.process_return(&event.order).await,
            WarehouseAction::ProcessDamage => self.process_damage(&event.order).await,
            WarehouseAction::ConfirmAllocation => {
                self.update_item(&event.order_id, item_status::ALLOCATION_CONFIRMED)
                    .await
            }
            WarehouseAction::ConfirmRelease => {
                self.update_item(&event.order_id, item_status::RELEASE_CONFIRMED)
                    .await
            }
        }
    }

    /// Add an order to its product's open batch, creating the batch if
    /// no pending one exists. At most one pending batch per product.
    pub async fn add_order_to_batch(&self, order: &Order, status: &str) -> Result<Batch> {
        if let Some(mut batch) = self
            .repository
            .find_pending_by_product(&order.product_id)
            .await?
        {
            let change = batch.upsert_item(&order.id, &order.product_id, order.quantity, status)?;
            self.repository.save(batch.clone()).await?;

            let event_type = match change {
                ItemChange::Added => BatchEvent::ITEM_ADDED,
                ItemChange::Updated => BatchEvent::ITEM_UPDATED,
            };
            self.emit(
                BatchEvent::new(event_type, &batch)
                    .with_item(&order.id, batch.item(&order.id).cloned()),
            )
            .await;
            return Ok(batch);
        }

        let mut batch = Batch::open(&order.product_id);
        self.repository.save(batch.clone()).await?;
        info!(batch_id = %batch.id, product_id = %batch.product_id, "opened new batch");
        self.emit(BatchEvent::new(BatchEvent::CREATED, &batch)).await;

        batch.upsert_item(&order.id, &order.product_id, order.quantity, status)?;
        self.repository.save(batch.clone()).await?;
        self.emit(
            BatchEvent::new(BatchEvent::ITEM_ADDED, &batch)
                .with_item(&order.id, batch.item(&order.id).cloned()),
        )
        .await;
        Ok(batch)
    }

    /// Remove an order's item; an emptied non-frozen batch is deleted.
    pub async fn remove_order_from_batch(&self, order_id: &str) -> Result<()> {
        let Some(mut batch) = self.repository.find_by_order(order_id).await? else {
            warn!(order_id, "no batch carries this order, nothing to release");
            return Ok(());
        };

        let item = batch.remove_item(order_id)?;

        if batch.items.is_empty() {
            // remove_item already rejected frozen batches, so an empty
            // batch here is always deletable.
            self.repository.delete(&batch.id).await?;
            info!(batch_id = %batch.id, "deleted batch after last item removal");
        } else {
            self.repository.save(batch.clone()).await?;
        }

        self.emit(
            BatchEvent::new(BatchEvent::ITEM_REMOVED, &batch).with_item(order_id, Some(item)),
        )
        .await;
        Ok(())
    }

    /// Set an item's status inside whatever batch carries the order.
    pub async fn update_item(&self, order_id: &str, status: &str) -> Result<()> {
        let Some(mut batch) = self.repository.find_by_order(order_id).await? else {
            warn!(order_id, status, "no batch carries this order, skipping item update");
            return Ok(());
        };

        batch.update_item_status(order_id, status)?;
        self.repository.save(batch.clone()).await?;

        self.emit(
            BatchEvent::new(BatchEvent::ITEM_UPDATED, &batch)
                .with_item(order_id, batch.item(order_id).cloned()),
        )
        .await;
        Ok(())
    }

    /// `order.returned`: mark the original item returned and append a
    /// sibling `<orderId>-return` item tracking the returned goods.
    pub async fn process_return(&self, order: &Order) -> Result<()> {
        self.update_item(&order.id, item_status::RETURNED).await?;

        let Some(mut batch) = self.repository.find_by_order(&order.id).await? else {
            return Ok(());
        };
        let product_id = batch.product_id.clone();
        let return_id = format!("{}-return", order.id);
        batch.upsert_item(&return_id, &product_id, order.quantity, item_status::RETURNED)?;
        self.repository.save(batch.clone()).await?;

        self.emit(
            BatchEvent::new(BatchEvent::ITEM_ADDED, &batch)
                .with_item(&return_id, batch.item(&return_id).cloned()),
        )
        .await;
        Ok(())
    }

    /// Damage sub-rules, switched on the order status the damage left
    /// behind. Statuses without a sub-rule are logged and skipped.
    pub async fn process_damage(&self, order: &Order) -> Result<()> {
        match order.status.as_str() {
            order_status::DAMAGE_DETECTED_MINOR => {
                self.ensure_item_with_status(order, item_status::DAMAGE_MINOR)
                    .await?;
            }
            order_status::DAMAGE_DETECTED_MAJOR => {
                let batch = self
                    .ensure_item_with_status(order, item_status::DAMAGE_MAJOR)
                    .await?;
                self.mark_damaged(&batch.id).await?;
            }
            "damage_processed" => {
                self.ensure_item_with_status(order, item_status::DAMAGE_PROCESSED)
                    .await?;
            }
            other => {
                warn!(order_id = %order.id, status = other, "no damage sub-rule for status, skipping");
            }
        }
        Ok(())
    }

    /// Move a batch into processing.
    pub async fn start_processing(&self, batch_id: &str) -> Result<Batch> {
        self.transition(batch_id, BatchStatus::Processing, BatchEvent::PROCESSING_STARTED)
            .await
    }

    /// Complete a processing batch.
    pub async fn complete(&self, batch_id: &str) -> Result<Batch> {
        self.transition(batch_id, BatchStatus::Completed, BatchEvent::COMPLETED)
            .await
    }

    /// Cancel a batch.
    pub async fn cancel(&self, batch_id: &str) -> Result<Batch> {
        self.transition(batch_id, BatchStatus::Cancelled, BatchEvent::CANCELLED)
            .await
    }

    /// Freeze a batch after damage.
    pub async fn mark_damaged(&self, batch_id: &str) -> Result<Batch> {
        self.transition(batch_id, BatchStatus::Damaged, BatchEvent::MARKED_DAMAGED)
            .await
    }

    /// Update the damaged (or freshly created) item, falling back to
    /// batch creation when no batch carries the order yet.
    async fn ensure_item_with_status(&self, order: &Order, status: &str) -> Result<Batch> {
        if let Some(mut batch) = self.repository.find_by_order(&order.id).await? {
            batch.update_item_status(&order.id, status)?;
            self.repository.save(batch.clone()).await?;
            self.emit(
                BatchEvent::new(BatchEvent::ITEM_UPDATED, &batch)
                    .with_item(&order.id, batch.item(&order.id).cloned()),
            )
            .await;
            Ok(batch)
        } else {
            self.add_order_to_batch(order, status).await
        }
    }

    async fn transition(
        &self,
        batch_id: &str,
        to: BatchStatus,
        event_type: &str,
    ) -> Result<Batch> {
        let mut batch = self
            .repository
            .find(batch_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                kind: "batch",
                id: batch_id.to_string(),
            })?;

        batch.transition(to)?;
        self.repository.save(batch.clone()).await?;
        info!(batch_id = %batch.id, status = %batch.status, "batch transitioned");

        self.emit(BatchEvent::new(event_type, &batch)).await;
        Ok(batch)
    }

    async fn emit(&self, event: BatchEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            error!(
                error = %e,
                event_type = %event.event_type,
                batch_id = %event.batch_id,
                "batch event publish failed"
            );
        }
    }
}
