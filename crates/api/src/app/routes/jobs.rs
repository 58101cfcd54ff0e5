use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::error;

use reportdeck_queue::JobData;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_job))
        .route("/queue/stats", get(queue_stats))
        .route("/queue/events", get(queue_events))
        .route("/queue/cleanup", post(queue_cleanup))
        .route("/:job_id", get(get_job))
        .route("/:job_id/retry", post(retry_job))
}

pub async fn submit_job(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SubmitJobRequest>,
) -> axum::response::Response {
    if body.use_case.is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "useCase is required");
    }
    if body.email.is_empty() || !body.email.contains('@') {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "a valid email is required",
        );
    }
    if !services.registry.contains(&body.use_case) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("unknown use case: {}", body.use_case),
        );
    }

    let data = JobData {
        use_case: body.use_case,
        recipient: body.email,
        filters: body.filters,
    };

    match services.queue.enqueue(data, None).await {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "message": "report job accepted",
                "jobId": job.id,
            })),
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to enqueue job");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "enqueue_failed",
                err.to_string(),
            )
        }
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    match services.queue.get_job(&job_id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(dto::job_to_json(job))).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("job {job_id} not found"),
        ),
        Err(err) => errors::queue_error_to_response(err),
    }
}

pub async fn queue_stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queue.stats().await {
        Ok(counts) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "stats": {
                    "waiting": counts.waiting,
                    "active": counts.active,
                    "completed": counts.completed,
                    "failed": counts.failed,
                    "delayed": counts.delayed,
                    "total": counts.total,
                    "config": {
                        "concurrency": services.worker_concurrency,
                        "maxAttempts": services.max_attempts,
                        "workerRunning": services.worker_is_running(),
                    },
                },
                "timestamp": Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
        Err(err) => errors::queue_error_to_response(err),
    }
}

/// Most recent lifecycle events from the queue's event stream.
pub async fn queue_events(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queue.recent_events(100).await {
        Ok(events) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "events": events,
                "timestamp": Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
        Err(err) => errors::queue_error_to_response(err),
    }
}

/// Requeue jobs stuck in the active set past the stall window.
pub async fn queue_cleanup(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queue.requeue_stalled().await {
        Ok(requeued) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "stalled jobs requeued",
                "requeued": requeued,
            })),
        )
            .into_response(),
        Err(err) => errors::queue_error_to_response(err),
    }
}

/// Promote a terminally-failed job back to waiting (attempts preserved).
pub async fn retry_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    match services.queue.retry_failed(&job_id).await {
        Ok(job) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "job requeued",
                "jobId": job.id,
                "attempts": job.attempts_made,
            })),
        )
            .into_response(),
        Err(err) => errors::queue_error_to_response(err),
    }
}
