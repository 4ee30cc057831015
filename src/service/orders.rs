//! HTTP API of the order service.

use super::{ApiError, HealthResponse};
use crate::domain::Order;
use crate::orders::OrderAggregator;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

/// Body of `POST /api/v1/orders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Ordering customer
    pub customer_id: String,
    /// Ordered product
    pub product_id: String,
    /// Quantity, defaults to 1
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Order value, defaults to 0
    #[serde(default)]
    pub total_amount: f64,
}

fn default_quantity() -> u32 {
    1
}

/// Body of `PUT /api/v1/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New status value
    pub status: String,
}

/// Build the order service router.
///
/// All write endpoints route through the aggregator so API-created
/// orders obey the same invariants and emit the same lifecycle events
/// as damage-synthesized ones.
pub fn router(aggregator: Arc<OrderAggregator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/orders", post(create_order).get(list_orders))
        .route("/api/v1/orders/{id}", get(get_order))
        .route("/api/v1/orders/{id}/status", put(update_status))
        .with_state(aggregator)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::new("order-service"))
}

async fn create_order(
    State(aggregator): State<Arc<OrderAggregator>>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    if body.customer_id.is_empty() || body.product_id.is_empty() {
        return Err(ApiError::BadRequest(
            "customerId and productId are required".into(),
        ));
    }
    if body.total_amount < 0.0 {
        return Err(ApiError::BadRequest("totalAmount cannot be negative".into()));
    }

    let order = aggregator
        .create_order(
            body.customer_id,
            body.product_id,
            body.quantity,
            body.total_amount,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(aggregator): State<Arc<OrderAggregator>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(aggregator.list().await?))
}

async fn get_order(
    State(aggregator): State<Arc<OrderAggregator>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    aggregator
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))
}

async fn update_status(
    State(aggregator): State<Arc<OrderAggregator>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    if body.status.trim().is_empty() {
        return Err(ApiError::BadRequest("status is required".into()));
    }
    let order = aggregator.update_status(&id, body.status.trim()).await?;
    Ok(Json(order))
}
