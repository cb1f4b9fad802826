use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::server::state::AppState;

/// Service liveness plus a couple of cheap gauges.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cached_entries": state.cache.len(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
