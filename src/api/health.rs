use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use super::AppState;

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Liveness check.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
