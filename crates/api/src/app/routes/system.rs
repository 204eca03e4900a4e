use axum::{response::IntoResponse, Json};

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "classifieds service" }))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
