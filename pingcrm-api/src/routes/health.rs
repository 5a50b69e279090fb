/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "store": "postgres: connected"
/// }
/// ```
///
/// The endpoint always answers 200; a store that cannot be reached turns the
/// status into `degraded`.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::app::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// Store backend and its connectivity
    pub store: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend = state.store.backend_name();

    let (status, connectivity) = match state.store.ping().await {
        Ok(()) => ("healthy", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, backend, "Store health check failed");
            ("degraded", "disconnected")
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: format!("{}: {}", backend, connectivity),
    })
}
