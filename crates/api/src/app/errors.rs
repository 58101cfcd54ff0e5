use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use reportdeck_queue::QueueError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn queue_error_to_response(err: QueueError) -> axum::response::Response {
    match err {
        QueueError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("job {id} not found"))
        }
        QueueError::InvalidState { id, expected, actual } => json_error(
            StatusCode::CONFLICT,
            "invalid_state",
            format!("job {id} is {actual}, expected {expected}"),
        ),
        QueueError::Redis(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "queue_error",
            e.to_string(),
        ),
        QueueError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
    }
}
