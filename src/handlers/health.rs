//! Health check

use crate::state::AppState;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "roomrelay",
        "rooms": state.registry.room_count(),
        "timestamp": SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }))
}
