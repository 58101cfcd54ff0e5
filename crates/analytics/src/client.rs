//! The analytics REST client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::AuthEntry;
use crate::credentials;
use crate::error::AnalyticsError;

/// Header carrying the signin token on every authenticated request.
const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Per-request hard timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport-level retry budget (network errors and retryable statuses).
const MAX_ATTEMPTS: u32 = 3;

/// Default size of a fetch batch.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 5;

/// One view to fetch: binding key, remote view name, bound filter params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub view_key: String,
    pub view_name: String,
    pub filter_params: Vec<(String, String)>,
}

/// Client for the remote analytics server.
///
/// The token cache is shared per site across the process. Each site slot is
/// guarded by its own async mutex, so concurrent refreshes collapse into a
/// single signin request: the first caller refreshes, later callers await
/// the slot and observe the fresh entry.
pub struct AnalyticsClient {
    http: reqwest::Client,
    base_url: String,
    sites: Mutex<HashMap<String, Arc<Mutex<Option<AuthEntry>>>>>,
}

impl AnalyticsClient {
    /// Build a client. Certificate validation is disabled only outside
    /// production (`verify_tls = false`).
    pub fn new(base_url: impl Into<String>, verify_tls: bool) -> Result<Self, AnalyticsError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sites: Mutex::new(HashMap::new()),
        })
    }

    /// Sign in with the site's personal access token and cache the result.
    pub async fn authenticate(&self, site: &str) -> Result<AuthEntry, AnalyticsError> {
        let creds = credentials::resolve(site)?;
        let url = format!("{}/auth/signin", self.base_url);
        let body = serde_json::json!({
            "credentials": {
                "personalAccessTokenName": creds.name,
                "personalAccessTokenSecret": creds.secret,
                "site": { "contentUrl": site },
            }
        });

        let response = self
            .execute_with_retry("auth.signin", || self.http.post(&url).json(&body))
            .await
            .map_err(|err| AnalyticsError::AuthFailed {
                site: site.to_string(),
                reason: err.to_string(),
            })?;

        let signin: SigninResponse =
            response
                .json()
                .await
                .map_err(|err| AnalyticsError::AuthFailed {
                    site: site.to_string(),
                    reason: format!("malformed signin response: {err}"),
                })?;

        info!(site, "authenticated against analytics server");
        Ok(AuthEntry::new(
            signin.credentials.token,
            signin.credentials.site.id,
            Utc::now(),
        ))
    }

    /// Return the cached token for a site, refreshing it when it is within
    /// the refresh threshold of expiry.
    ///
    /// Refreshes are single-flight per site.
    pub async fn get_valid_token(&self, site: &str) -> Result<AuthEntry, AnalyticsError> {
        let slot = {
            let mut sites = self.sites.lock().await;
            sites.entry(site.to_string()).or_default().clone()
        };

        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.clone());
            }
            debug!(site, "cached token near expiry, refreshing");
        }

        let fresh = self.authenticate(site).await?;
        *entry = Some(fresh.clone());
        Ok(fresh)
    }

    /// Sites with a cached auth entry (for introspection surfaces).
    pub async fn cached_sites(&self) -> Vec<String> {
        self.sites.lock().await.keys().cloned().collect()
    }

    /// Invalidate every cached token, signing out server-side where
    /// possible. Used during shutdown; failures are logged and ignored.
    pub async fn sign_out_all(&self) {
        let mut sites = self.sites.lock().await;
        let url = format!("{}/auth/signout", self.base_url);
        for (site, slot) in sites.drain() {
            let Some(entry) = slot.lock().await.take() else {
                continue;
            };
            match self.http.post(&url).header(AUTH_HEADER, &entry.token).send().await {
                Ok(_) => debug!(site = %site, "signed out"),
                Err(err) => warn!(site = %site, error = %err, "signout failed"),
            }
        }
    }

    /// Fetch the requested views as CSV, bounded by `concurrency`.
    ///
    /// The input is processed in sequential batches of `concurrency`
    /// requests, each batch awaited in full, so in-flight requests never
    /// exceed the bound. Failed views are skipped and logged; the returned
    /// map's keys are a subset of the request keys. An empty map (with a
    /// non-empty input) means every fetch failed; the caller treats that as
    /// a hard failure.
    pub async fn fetch_views_in_parallel(
        &self,
        requests: &[ViewRequest],
        workbook_name: &str,
        site: &str,
        concurrency: usize,
    ) -> Result<HashMap<String, String>, AnalyticsError> {
        if requests.is_empty() {
            return Ok(HashMap::new());
        }

        let auth = self.get_valid_token(site).await?;
        let workbook_id = self.lookup_workbook(&auth, workbook_name).await?;
        let view_ids = self.list_views(&auth, &workbook_id).await?;

        let mut fetched = HashMap::new();
        for batch in requests.chunks(concurrency.max(1)) {
            let results = futures::future::join_all(batch.iter().map(|request| async {
                let outcome = match view_ids.get(&request.view_name) {
                    Some(view_id) => self.fetch_view_csv(&auth, request, view_id).await,
                    None => Err(AnalyticsError::ViewFetchFailed {
                        view_key: request.view_key.clone(),
                        reason: format!("view {} not present in workbook", request.view_name),
                    }),
                };
                (request.view_key.clone(), outcome)
            }))
            .await;

            for (view_key, outcome) in results {
                match outcome {
                    Ok(csv) => {
                        fetched.insert(view_key, csv);
                    }
                    Err(err) => {
                        warn!(view_key = %view_key, error = %err, "view fetch failed, skipping");
                    }
                }
            }
        }

        if fetched.is_empty() {
            warn!(workbook = workbook_name, "every view fetch failed");
        }
        Ok(fetched)
    }

    async fn lookup_workbook(
        &self,
        auth: &AuthEntry,
        workbook_name: &str,
    ) -> Result<String, AnalyticsError> {
        let url = format!("{}/sites/{}/workbooks", self.base_url, auth.site_id);
        let filter = format!("contentUrl:eq:{workbook_name}");

        let response = self
            .execute_with_retry("workbooks.list", || {
                self.http
                    .get(&url)
                    .header(AUTH_HEADER, &auth.token)
                    .query(&[("filter", filter.as_str())])
            })
            .await?;

        let listing: WorkbookListResponse = response.json().await?;
        listing
            .workbooks
            .workbook
            .into_iter()
            .next()
            .map(|workbook| workbook.id)
            .ok_or_else(|| AnalyticsError::WorkbookNotFound {
                workbook_name: workbook_name.to_string(),
            })
    }

    async fn list_views(
        &self,
        auth: &AuthEntry,
        workbook_id: &str,
    ) -> Result<HashMap<String, String>, AnalyticsError> {
        let url = format!(
            "{}/sites/{}/workbooks/{}/views",
            self.base_url, auth.site_id, workbook_id
        );

        let response = self
            .execute_with_retry("views.list", || {
                self.http.get(&url).header(AUTH_HEADER, &auth.token)
            })
            .await
            .map_err(|err| AnalyticsError::ViewListingFailed(err.to_string()))?;

        let listing: ViewListResponse = response
            .json()
            .await
            .map_err(|err| AnalyticsError::ViewListingFailed(err.to_string()))?;

        Ok(listing
            .views
            .view
            .into_iter()
            .map(|view| (view.name, view.id))
            .collect())
    }

    async fn fetch_view_csv(
        &self,
        auth: &AuthEntry,
        request: &ViewRequest,
        view_id: &str,
    ) -> Result<String, AnalyticsError> {
        let url = format!(
            "{}/sites/{}/views/{}/data",
            self.base_url, auth.site_id, view_id
        );

        let response = self
            .execute_with_retry("views.data", || {
                self.http
                    .get(&url)
                    .header(AUTH_HEADER, &auth.token)
                    .query(&[("maxAge", "1")])
                    .query(&request.filter_params)
            })
            .await
            .map_err(|err| AnalyticsError::ViewFetchFailed {
                view_key: request.view_key.clone(),
                reason: err.to_string(),
            })?;

        response
            .text()
            .await
            .map_err(|err| AnalyticsError::ViewFetchFailed {
                view_key: request.view_key.clone(),
                reason: err.to_string(),
            })
    }

    /// Issue a request with up to [`MAX_ATTEMPTS`] tries. Network errors and
    /// retryable statuses (408, 429, 5xx) back off exponentially; other
    /// non-success statuses fail immediately.
    async fn execute_with_retry(
        &self,
        context: &str,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AnalyticsError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match build().send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !(is_retryable_status(status) && attempt < MAX_ATTEMPTS) {
                        return Err(AnalyticsError::Status {
                            status,
                            context: context.to_string(),
                        });
                    }
                    debug!(context, status, attempt, "retryable status");
                }
                Err(err) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(err.into());
                    }
                    debug!(context, error = %err, attempt, "network error, retrying");
                }
            }
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
}

/// Whether a status warrants a retry: timeouts, throttling, server errors.
fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// Exponential transport backoff: 500ms * 2^(attempt-1), capped at 10s.
fn backoff_delay(attempt: u32) -> Duration {
    let millis = 500u64.saturating_mul(1 << (attempt.saturating_sub(1)).min(16));
    Duration::from_millis(millis).min(Duration::from_secs(10))
}

#[derive(Debug, Deserialize)]
struct SigninResponse {
    credentials: SigninCredentials,
}

#[derive(Debug, Deserialize)]
struct SigninCredentials {
    token: String,
    site: SigninSite,
}

#[derive(Debug, Deserialize)]
struct SigninSite {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WorkbookListResponse {
    #[serde(default)]
    workbooks: WorkbookList,
}

#[derive(Debug, Default, Deserialize)]
struct WorkbookList {
    #[serde(default)]
    workbook: Vec<WorkbookRef>,
}

#[derive(Debug, Deserialize)]
struct WorkbookRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ViewListResponse {
    #[serde(default)]
    views: ViewList,
}

#[derive(Debug, Default, Deserialize)]
struct ViewList {
    #[serde(default)]
    view: Vec<ViewRef>,
}

#[derive(Debug, Deserialize)]
struct ViewRef {
    id: String,
    name: String,
}
