use axum::{routing::get, Router};

pub mod jobs;
pub mod system;

/// Router for all endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/health/live", get(system::live))
        .route("/health/ready", get(system::ready))
        .nest("/api/v1/jobs", jobs::router())
}
