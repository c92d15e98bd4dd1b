//! HTTP routes.

pub mod variants;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::state::AppState;

/// Route table for the service.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/create-custom-variant", post(variants::create_custom_variant))
}

/// Liveness health check endpoint. Does not check dependencies.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "API is running" }))
}
