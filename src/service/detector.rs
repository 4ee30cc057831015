//! Control-plane HTTP surface of the damage detector.

use super::{ApiError, HealthResponse};
use crate::detector::{TemperatureRange, Thresholds};
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Body of `POST /temperature-limits`.
#[derive(Debug, Deserialize, Serialize)]
pub struct TemperatureLimits {
    /// New lower bound
    pub min_temperature: f64,
    /// New upper bound, must exceed the lower bound
    pub max_temperature: f64,
}

/// Build the detector's control-plane router.
pub fn router(thresholds: Arc<Thresholds>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/temperature-limits", post(set_limits))
        .with_state(thresholds)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::new("damage-detector"))
}

async fn set_limits(
    State(thresholds): State<Arc<Thresholds>>,
    Json(body): Json<TemperatureLimits>,
) -> Result<Json<TemperatureLimits>, ApiError> {
    let range = TemperatureRange::new(body.min_temperature, body.max_temperature)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    thresholds.set(range).await;
    info!(
        min = range.min,
        max = range.max,
        "temperature limits updated"
    );

    Ok(Json(TemperatureLimits {
        min_temperature: range.min,
        max_temperature: range.max,
    }))
}
