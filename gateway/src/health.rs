// ============================================================================
// Health Endpoints
// ============================================================================
// Liveness/readiness probes, mounted outside the gate so orchestrators can
// reach them without a session.

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn health_live() -> Json<Value> {
    Json(json!({ "status": "live" }))
}

pub async fn health_ready() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}
