//! Health check and service banner (no auth)

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub timestamp: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "caseload".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET /
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Caseload API",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}
