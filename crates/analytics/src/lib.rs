//! Authenticated client for the remote analytics server.
//!
//! Covers personal-access-token auth with a per-site token cache (refreshes
//! are deduplicated so concurrent callers trigger exactly one signin per
//! site), workbook/view lookup, and bounded parallel CSV view fetch with
//! partial-failure semantics.

pub mod auth;
pub mod client;
pub mod credentials;
pub mod error;

pub use auth::AuthEntry;
pub use client::{AnalyticsClient, ViewRequest, DEFAULT_FETCH_CONCURRENCY};
pub use credentials::PatCredentials;
pub use error::AnalyticsError;
