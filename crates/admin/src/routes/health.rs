//! Liveness and readiness checks.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};

use crate::backend::Collection;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /health/ready
///
/// Ready once the document store answers a read.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store().list(Collection::Products).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Backend not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
