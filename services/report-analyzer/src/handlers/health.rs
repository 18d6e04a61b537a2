use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let completion_status = if state.config.llm.api_key.is_empty() {
        json!({"status": "unconfigured", "message": "No API key set"})
    } else {
        json!({"status": "configured", "model": state.config.llm.model})
    };

    let status = if state.config.llm.api_key.is_empty() { "degraded" } else { "healthy" };

    Json(json!({
        "status": status,
        "service": "brandlens-report-analyzer",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "completion_api": completion_status
        }
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
