//! Per-site credential resolution from the environment.

use crate::error::AnalyticsError;

/// A personal-access-token pair used for signin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatCredentials {
    pub name: String,
    pub secret: String,
}

/// Resolve credentials for a site from the process environment.
///
/// `<SITE_UPPER>_PAT_NAME` / `<SITE_UPPER>_PAT_SECRET` win (hyphens mapped to
/// underscores, case-folded upper); the global `PAT_NAME` / `PAT_SECRET`
/// pair is the fallback.
pub fn resolve(site: &str) -> Result<PatCredentials, AnalyticsError> {
    resolve_with(site, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], with an injectable lookup (used in tests).
pub fn resolve_with(
    site: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PatCredentials, AnalyticsError> {
    let prefix = site_env_prefix(site);

    let name = lookup(&format!("{prefix}_PAT_NAME")).or_else(|| lookup("PAT_NAME"));
    let secret = lookup(&format!("{prefix}_PAT_SECRET")).or_else(|| lookup("PAT_SECRET"));

    match (name, secret) {
        (Some(name), Some(secret)) => Ok(PatCredentials { name, secret }),
        _ => Err(AnalyticsError::CredentialsMissing {
            site: site.to_string(),
        }),
    }
}

fn site_env_prefix(site: &str) -> String {
    site.replace('-', "_").to_uppercase()
}
