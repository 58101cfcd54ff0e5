//! Auth tokens and their freshness rules.

use chrono::{DateTime, Duration, Utc};

/// How long a signin token lives on the remote server, in minutes.
pub const TOKEN_LIFETIME_MINUTES: i64 = 120;

/// Tokens are refreshed this many minutes before they actually expire.
pub const REFRESH_THRESHOLD_MINUTES: i64 = 10;

/// A cached signin result for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEntry {
    pub token: String,
    pub site_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthEntry {
    /// Build an entry expiring a full token lifetime from `now`.
    pub fn new(token: impl Into<String>, site_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            site_id: site_id.into(),
            expires_at: now + Duration::minutes(TOKEN_LIFETIME_MINUTES),
        }
    }

    /// Whether the entry can still be used at `now` without a refresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::minutes(REFRESH_THRESHOLD_MINUTES)
    }
}
