use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version and which optional features are available.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "screener",
        "classification_available": state.pipeline.classification_available(),
        "generation_configured": state.generator.is_configured(),
        "active_sessions": state.sessions.len().await,
    }))
}
