use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health: liveness check for the hosting platform.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stats = state.service.stats();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "registered_destinations": stats.registered_destinations,
        "broadcasts": stats.broadcasts,
    }))
}
