use axum::response::Json;
use serde_json::{json, Value};

/// Liveness probe; reports nothing about engine readiness.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
