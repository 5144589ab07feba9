//! # General Route Handlers

use super::AppState;
use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

/// The handler for the root (`/`) endpoint.
pub async fn root() -> &'static str {
    "zygote server is running."
}

/// `GET /health`. Outside `/api`, so never rate limited.
pub async fn health_check(State(app_state): State<AppState>) -> Json<Value> {
    let environment = if app_state.config.is_development() {
        "development"
    } else {
        "production"
    };
    Json(json!({
        "success": true,
        "message": "ZYGOTE API is running",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "environment": environment,
    }))
}
