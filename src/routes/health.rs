use axum::response::Json;
use serde_json::json;

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/health`
/// - **Response**: `{"status": "ok"}`
///
/// Does not touch the user directory, so it reports process liveness only.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
