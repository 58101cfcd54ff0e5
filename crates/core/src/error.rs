//! Domain error model.
//!
//! Domain errors represent **deterministic failures of the report domain** -
//! bad input, unknown use cases, missing view configuration. Infrastructure
//! errors (network, Redis, SMTP) live in their own crates' error types.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error (deterministic, business failures).
///
/// Errors are `Clone` and `PartialEq` so they can be compared in tests and
/// carried across task boundaries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input at the HTTP edge).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested use case is not configured.
    #[error("unknown use case: {0}")]
    UseCaseNotFound(String),

    /// A view referenced by a manifest has no configuration entry.
    #[error("missing view configuration: {0}")]
    ViewConfigMissing(String),

    /// A requested resource was not found.
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn use_case_not_found(use_case: impl Into<String>) -> Self {
        Self::UseCaseNotFound(use_case.into())
    }

    pub fn view_config_missing(view_key: impl Into<String>) -> Self {
        Self::ViewConfigMissing(view_key.into())
    }
}
