use std::sync::Arc;
use std::time::Instant;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use herald_dispatch::BroadcastService;

/// Shared state handed to the HTTP handlers.
pub struct AppState {
    pub service: Arc<BroadcastService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: Arc<BroadcastService>) -> Self {
        Self {
            service,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::health::health_handler))
        .route("/health", get(crate::http::health::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
