//! The Batch aggregate: orders grouped by product for warehouse handling.

use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Open batch accepting items; at most one per product
    Pending,
    /// Picked up by warehouse processing
    Processing,
    /// Successfully processed; terminal except for damage
    Completed,
    /// Abandoned; terminal except for damage
    Cancelled,
    /// Frozen after damage; fully terminal
    Damaged,
}

impl BatchStatus {
    /// Parse the lowercase wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BatchStatus::Pending),
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "cancelled" => Some(BatchStatus::Cancelled),
            "damaged" => Some(BatchStatus::Damaged),
            _ => None,
        }
    }

    /// Lowercase wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Damaged => "damaged",
        }
    }

    /// Completed and cancelled batches accept no further item mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Cancelled)
    }

    /// Permitted transitions:
    ///
    /// ```text
    /// pending    -> processing | cancelled | damaged
    /// processing -> completed  | cancelled | damaged
    /// completed  -> damaged
    /// cancelled  -> damaged
    /// damaged    -> (none)
    /// ```
    pub fn can_transition_to(&self, to: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Pending, Damaged)
                | (Processing, Completed)
                | (Processing, Cancelled)
                | (Processing, Damaged)
                | (Completed, Damaged)
                | (Cancelled, Damaged)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed vocabulary of batch item statuses.
///
/// Like order statuses these travel as free-form strings; the constants
/// are the values the batch service itself writes.
pub mod item_status {
    /// Inventory allocated for the order
    pub const ALLOCATED: &str = "allocated";
    /// Order shipped
    pub const SHIPPED: &str = "shipped";
    /// Delivery confirmed
    pub const DELIVERED: &str = "delivered";
    /// Order returned by the customer
    pub const RETURNED: &str = "returned";
    /// Minor damage recorded on the item
    pub const DAMAGE_MINOR: &str = "damage_minor";
    /// Major damage recorded on the item
    pub const DAMAGE_MAJOR: &str = "damage_major";
    /// Damage handling finished
    pub const DAMAGE_PROCESSED: &str = "damage_processed";
    /// Upstream confirmed the allocation
    pub const ALLOCATION_CONFIRMED: &str = "allocation_confirmed";
    /// Upstream confirmed the release
    pub const RELEASE_CONFIRMED: &str = "release_confirmed";
}

/// Item statuses that stamp `processed_at` on the item.
const PROCESSED_ITEM_STATUSES: &[&str] = &["processed", "shipped", "delivered"];

/// One order's slot inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    /// Owning order; unique within the batch
    pub order_id: String,
    /// Product, always equal to the batch product
    pub product_id: String,
    /// Quantity carried over from the order
    pub quantity: u32,
    /// Warehouse-facing item status (allocated, shipped, damage_minor, ...)
    pub status: String,
    /// When the item joined the batch
    pub added_at: DateTime<Utc>,
    /// Set once the status reaches processed, shipped or delivered
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl BatchItem {
    fn new(order_id: &str, product_id: &str, quantity: u32, status: &str) -> Self {
        let mut item = Self {
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            status: String::new(),
            added_at: Utc::now(),
            processed_at: None,
        };
        item.set_status(status);
        item
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        if PROCESSED_ITEM_STATUSES.contains(&status) {
            self.processed_at = Some(Utc::now());
        }
    }
}

/// Outcome of an add-or-update item operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemChange {
    /// The order was appended as a new item
    Added,
    /// The order already had an item; it was updated in place
    Updated,
}

/// A group of orders for one product, owned by the batch service.
///
/// Invariants: every item's `product_id` equals the batch's,
/// `total_items` equals `items.len()`, and at most one pending batch
/// exists per product at any time (enforced by the aggregator through
/// the repository query, not here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// Batch id, `BATCH-<productId>-<UTCYYYYMMDDHHMMSS>`
    pub id: String,
    /// Product all items share
    pub product_id: String,
    /// Lifecycle state
    pub status: BatchStatus,
    /// Member items in insertion order
    pub items: Vec<BatchItem>,
    /// Always `items.len()`
    pub total_items: usize,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
    /// Set when processing starts
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Batch {
    /// Open a new pending batch for a product.
    pub fn open(product_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: format!("BATCH-{}-{}", product_id, now.format("%Y%m%d%H%M%S")),
            product_id: product_id.to_string(),
            status: BatchStatus::Pending,
            items: Vec::new(),
            total_items: 0,
            created_at: now,
            updated_at: now,
            processed_at: None,
        }
    }

    /// Whether item mutation is forbidden.
    pub fn is_frozen(&self) -> bool {
        self.status == BatchStatus::Damaged || self.status.is_terminal()
    }

    /// Look up the item for an order.
    pub fn item(&self, order_id: &str) -> Option<&BatchItem> {
        self.items.iter().find(|i| i.order_id == order_id)
    }

    /// Whether the batch carries an item for the order.
    pub fn contains_order(&self, order_id: &str) -> bool {
        self.item(order_id).is_some()
    }

    /// Move the batch to a new lifecycle state.
    pub fn transition(&mut self, to: BatchStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::IllegalTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        if to == BatchStatus::Processing {
            self.processed_at = Some(Utc::now());
        }
        self.touch();
        Ok(())
    }

    /// Add an order as an item, or update the existing item in place.
    ///
    /// The order's product must match the batch product; a mismatch is a
    /// domain error and leaves the batch untouched.
    pub fn upsert_item(
        &mut self,
        order_id: &str,
        product_id: &str,
        quantity: u32,
        status: &str,
    ) -> Result<ItemChange, DomainError> {
        if self.is_frozen() {
            return Err(DomainError::BatchFrozen(self.id.clone()));
        }
        if product_id != self.product_id {
            return Err(DomainError::ProductMismatch {
                order_id: order_id.to_string(),
                order_product: product_id.to_string(),
                batch_id: self.id.clone(),
                batch_product: self.product_id.clone(),
            });
        }

        let change = if let Some(item) = self.items.iter_mut().find(|i| i.order_id == order_id) {
            item.quantity = quantity;
            item.set_status(status);
            ItemChange::Updated
        } else {
            self.items.push(BatchItem::new(order_id, product_id, quantity, status));
            ItemChange::Added
        };
        self.total_items = self.items.len();
        self.touch();
        Ok(change)
    }

    /// Remove the item for an order, returning it.
    pub fn remove_item(&mut self, order_id: &str) -> Result<BatchItem, DomainError> {
        if self.is_frozen() {
            return Err(DomainError::BatchFrozen(self.id.clone()));
        }
        let idx = self
            .items
            .iter()
            .position(|i| i.order_id == order_id)
            .ok_or_else(|| DomainError::ItemNotFound {
                order_id: order_id.to_string(),
                batch_id: self.id.clone(),
            })?;
        let item = self.items.remove(idx);
        self.total_items = self.items.len();
        self.touch();
        Ok(item)
    }

    /// Update an existing item's status.
    pub fn update_item_status(&mut self, order_id: &str, status: &str) -> Result<(), DomainError> {
        if self.is_frozen() {
            return Err(DomainError::BatchFrozen(self.id.clone()));
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.order_id == order_id)
            .ok_or_else(|| DomainError::ItemNotFound {
                order_id: order_id.to_string(),
                batch_id: self.id.clone(),
            })?;
        item.set_status(status);
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Lifecycle event published after a successful batch mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEvent {
    /// `batch.created`, `batch.item_added`, ...
    pub event_type: String,
    /// Batch the event is scoped to
    pub batch_id: String,
    /// Product the batch groups
    pub product_id: String,
    /// Snapshot of the batch after the mutation
    pub batch: Batch,
    /// Present for item-scoped events
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub order_id: Option<String>,
    /// Snapshot of the affected item for item-scoped events
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub item_details: Option<BatchItem>,
    /// Publish time
    pub timestamp: DateTime<Utc>,
}

impl BatchEvent {
    /// A new batch was opened.
    pub const CREATED: &'static str = "batch.created";
    /// An order joined the batch.
    pub const ITEM_ADDED: &'static str = "batch.item_added";
    /// An order left the batch.
    pub const ITEM_REMOVED: &'static str = "batch.item_removed";
    /// An item's status or quantity changed.
    pub const ITEM_UPDATED: &'static str = "batch.item_updated";
    /// The batch moved to processing.
    pub const PROCESSING_STARTED: &'static str = "batch.processing_started";
    /// The batch completed.
    pub const COMPLETED: &'static str = "batch.completed";
    /// The batch was cancelled.
    pub const CANCELLED: &'static str = "batch.cancelled";
    /// The batch was frozen after damage.
    pub const MARKED_DAMAGED: &'static str = "batch.marked_damaged";

    /// Build a batch-scoped event from a snapshot.
    pub fn new(event_type: &str, batch: &Batch) -> Self {
        Self {
            event_type: event_type.to_string(),
            batch_id: batch.id.clone(),
            product_id: batch.product_id.clone(),
            batch: batch.clone(),
            order_id: None,
            item_details: None,
            timestamp: Utc::now(),
        }
    }

    /// Scope the event to a single item.
    pub fn with_item(mut self, order_id: &str, item: Option<BatchItem>) -> Self {
        self.order_id = Some(order_id.to_string());
        self.item_details = item;
        self
    }
}
