//! Aggregate repositories.
//!
//! Aggregates are reached only through these traits so the in-memory
//! implementations can later be swapped for disk-backed ones without
//! touching the aggregators. All returned values are deep copies; the
//! caller never aliases repository-internal state.

mod memory;

pub use memory::{InMemoryBatchRepository, InMemoryOrderRepository};

use crate::domain::{Batch, BatchStatus, Order};
use crate::Result;
use async_trait::async_trait;

/// Storage for the Order aggregate.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Insert or replace an order.
    async fn save(&self, order: Order) -> Result<()>;

    /// Fetch an order snapshot by id.
    async fn find(&self, id: &str) -> Result<Option<Order>>;

    /// Snapshot all orders.
    async fn list(&self) -> Result<Vec<Order>>;
}

/// Storage for the Batch aggregate.
#[async_trait]
pub trait BatchRepository: Send + Sync + 'static {
    /// Insert or replace a batch.
    async fn save(&self, batch: Batch) -> Result<()>;

    /// Fetch a batch snapshot by id.
    async fn find(&self, id: &str) -> Result<Option<Batch>>;

    /// Remove a batch. Removing an unknown id is a no-op.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Snapshot all batches.
    async fn list(&self) -> Result<Vec<Batch>>;

    /// The open (pending) batch for a product, if one exists.
    ///
    /// The aggregator relies on this to keep at most one pending batch
    /// per product.
    async fn find_pending_by_product(&self, product_id: &str) -> Result<Option<Batch>>;

    /// All batches for a product.
    async fn find_by_product(&self, product_id: &str) -> Result<Vec<Batch>>;

    /// All batches in a given state.
    async fn find_by_status(&self, status: BatchStatus) -> Result<Vec<Batch>>;

    /// The batch containing an item for the order, if any.
    async fn find_by_order(&self, order_id: &str) -> Result<Option<Batch>>;
}
