//! HTTP surfaces for the three services.
//!
//! Each service exposes a small read-mostly JSON API next to its
//! consumer loop. Health endpoints answer 200 while the process is
//! alive; transient broker flaps are deliberately not surfaced there.

pub mod detector;
pub mod orders;
pub mod warehouse;

use crate::error::DomainError;
use crate::shutdown::Shutdown;
use crate::{ColdchainError, Result};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

/// Graceful HTTP shutdown deadline.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Payload of every `/health` endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
}

impl HealthResponse {
    fn new(service: &'static str) -> Self {
        Self {
            status: "healthy",
            service,
            version: crate::VERSION,
        }
    }
}

/// Error body returned by all API endpoints.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// HTTP-facing error with the pipeline's status mapping: 404 unknown
/// id, 400 invalid parameters, 500 repository or publisher failures.
#[derive(Debug)]
pub enum ApiError {
    /// 404
    NotFound(String),
    /// 400
    BadRequest(String),
    /// 500
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ColdchainError> for ApiError {
    fn from(err: ColdchainError) -> Self {
        match err {
            ColdchainError::Domain(DomainError::NotFound { .. }) => {
                ApiError::NotFound(err.to_string())
            }
            ColdchainError::Domain(_) | ColdchainError::Config(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Serve a router until shutdown, with a bounded graceful drain.
pub async fn serve(router: Router, port: u16, shutdown: Shutdown) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ColdchainError::Config(format!("cannot bind HTTP port {port}: {e}")))?;

    info!(%addr, "HTTP server listening");

    let graceful = {
        let shutdown = shutdown.clone();
        async move { shutdown.triggered().await }
    };
    let server = async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(graceful)
            .await
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ColdchainError::Transport(format!("HTTP server error: {e}")))
        }
        _ = async {
            shutdown.triggered().await;
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        } => {
            warn!("HTTP graceful shutdown deadline reached, dropping connections");
            Ok(())
        }
    }
}
