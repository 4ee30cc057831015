//! Read-only HTTP API of the batch service.

use super::{ApiError, HealthResponse};
use crate::domain::{Batch, BatchStatus};
use crate::repository::BatchRepository;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Build the batch service router.
pub fn router(repository: Arc<dyn BatchRepository>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/batches", get(list_batches))
        .route("/api/v1/batches/product/{product_id}", get(by_product))
        .route("/api/v1/batches/status/{status}", get(by_status))
        .route("/api/v1/batches/order/{order_id}", get(by_order))
        .with_state(repository)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::new("batch-service"))
}

async fn list_batches(
    State(repository): State<Arc<dyn BatchRepository>>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    Ok(Json(repository.list().await?))
}

async fn by_product(
    State(repository): State<Arc<dyn BatchRepository>>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    if product_id.trim().is_empty() {
        return Err(ApiError::BadRequest("productId is required".into()));
    }
    Ok(Json(repository.find_by_product(&product_id).await?))
}

async fn by_status(
    State(repository): State<Arc<dyn BatchRepository>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    let status = BatchStatus::parse(&status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown batch status {status:?}")))?;
    Ok(Json(repository.find_by_status(status).await?))
}

async fn by_order(
    State(repository): State<Arc<dyn BatchRepository>>,
    Path(order_id): Path<String>,
) -> Result<Json<Batch>, ApiError> {
    repository
        .find_by_order(&order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no batch carries order {order_id}")))
}
