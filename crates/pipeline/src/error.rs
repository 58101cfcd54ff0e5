//! Fatal job errors. Each propagates to the worker, which decides retry vs
//! terminal failure.

use thiserror::Error;

use reportdeck_analytics::AnalyticsError;
use reportdeck_core::DomainError;
use reportdeck_mail::MailError;

use crate::writer::RenderError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration problem (unknown use case, missing view config).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Fatal remote failure (auth, workbook lookup, view listing).
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Every configured view failed to fetch.
    #[error("No view data was successfully fetched")]
    NoViewsFetched,

    /// Views were fetched but none survived transformation.
    #[error("All view transformations failed")]
    AllTransformsFailed,

    #[error("presentation render failed: {0}")]
    Render(#[from] RenderError),

    #[error("email delivery failed: {0}")]
    Email(#[from] MailError),
}
