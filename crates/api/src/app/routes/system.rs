use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// Readiness requires a successful queue stats call.
pub async fn ready(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    match services.queue.stats().await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ready"})),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unavailable",
                "message": err.to_string(),
            })),
        ),
    }
}
