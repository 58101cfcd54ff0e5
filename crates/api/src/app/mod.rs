//! HTTP application wiring (axum router + shared services).
//!
//! Layout, matching the rest of the workspace's conventions:
//! - `services.rs`: the shared state handed to handlers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
