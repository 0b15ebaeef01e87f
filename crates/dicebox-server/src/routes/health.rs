use axum::Json;

/// GET / — liveness probe.
pub async fn is_alive() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "ok" }))
}
