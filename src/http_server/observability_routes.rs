//! Liveness and counters: `GET /health`, `GET /metrics`.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::dispatch::Dispatcher;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn observability_routes(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(dispatcher)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics_handler(State(dispatcher): State<Arc<Dispatcher>>) -> Json<Value> {
    Json(metrics_body(&dispatcher))
}

/// Counters, cache statistics and the names of open channels
pub fn metrics_body(dispatcher: &Dispatcher) -> Value {
    let registry = dispatcher.registry();
    let cache = registry.cache();
    let stats = cache.stats();

    json!({
        "counters": dispatcher.metrics().snapshot(),
        "cache": {
            "capacity": cache.capacity(),
            "entries": cache.len(),
            "hits": stats.hits,
            "misses": stats.misses,
            "evictions": stats.evictions,
        },
        "open_channels": registry.open_channels(),
    })
}
