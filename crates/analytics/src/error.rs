//! Failure taxonomy of the analytics client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// No PAT pair could be resolved for the site.
    #[error("no credentials configured for site {site}")]
    CredentialsMissing { site: String },

    /// The signin request was rejected or malformed.
    #[error("authentication failed for site {site}: {reason}")]
    AuthFailed { site: String, reason: String },

    /// No workbook matched the configured content URL.
    #[error("workbook not found: {workbook_name}")]
    WorkbookNotFound { workbook_name: String },

    /// The workbook's view listing could not be retrieved.
    #[error("view listing failed: {0}")]
    ViewListingFailed(String),

    /// A single view fetch failed. Non-fatal to the batch.
    #[error("view fetch failed for {view_key}: {reason}")]
    ViewFetchFailed { view_key: String, reason: String },

    /// Transport-level failure (connect, timeout, decode).
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status that is not retryable (or retries were exhausted).
    #[error("unexpected status {status} from {context}")]
    Status { status: u16, context: String },
}
