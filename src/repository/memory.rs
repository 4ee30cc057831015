//! In-memory repository implementations.

use super::{BatchRepository, OrderRepository};
use crate::domain::{Batch, BatchStatus, Order};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local order store guarded by a read/write lock.
///
/// Readers (HTTP queries) run in parallel; the consumer task takes the
/// write lock only for the duration of a single save.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> Result<()> {
        self.inner.write().await.insert(order.id.clone(), order);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Order>> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.inner.read().await.values().cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }
}

/// Process-local batch store guarded by a read/write lock.
#[derive(Debug, Default)]
pub struct InMemoryBatchRepository {
    inner: RwLock<HashMap<String, Batch>>,
}

impl InMemoryBatchRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn save(&self, batch: Batch) -> Result<()> {
        self.inner.write().await.insert(batch.id.clone(), batch);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Batch>> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.inner.write().await.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Batch>> {
        let mut batches: Vec<Batch> = self.inner.read().await.values().cloned().collect();
        batches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(batches)
    }

    async fn find_pending_by_product(&self, product_id: &str) -> Result<Option<Batch>> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|b| b.product_id == product_id && b.status == BatchStatus::Pending)
            .cloned())
    }

    async fn find_by_product(&self, product_id: &str) -> Result<Vec<Batch>> {
        let mut batches: Vec<Batch> = self
            .inner
            .read()
            .await
            .values()
            .filter(|b| b.product_id == product_id)
            .cloned()
            .collect();
        batches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(batches)
    }

    async fn find_by_status(&self, status: BatchStatus) -> Result<Vec<Batch>> {
        let mut batches: Vec<Batch> = self
            .inner
            .read()
            .await
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect();
        batches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(batches)
    }

    async fn find_by_order(&self, order_id: &str) -> Result<Option<Batch>> {
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|b| b.contains_order(order_id))
            .cloned())
    }
}
