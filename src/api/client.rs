use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate};
use log::debug;
use reqwest::blocking::Client;
use thiserror::Error;

use super::auth::{Authenticator, Credentials, TOKEN_URL};
use super::types::RecordingsPage;
use crate::models::Meeting;
use crate::transfer::RecordingSource;

pub const API_BASE_URL: &str = "https://api.zoom.us/v2";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: u32 = 300;
/// The list endpoint accepts at most a month per request.
const WINDOW_DAYS: i64 = 30;
const PAGE_DELAY_MS: u64 = 500;

/// Truncate a string for log output, appending "..." if truncated.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let end = s.floor_char_boundary(max_len);
        format!("{}...", &s[..end])
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed. Check the [source] account_id, client_id and client_secret.")]
    Unauthorized,

    #[error("Resource not found (404). Check the configured user ids.")]
    NotFound,

    #[error("Rate limited (429). Please wait before making more requests.")]
    RateLimited,

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Map a non-success HTTP status to an error.
pub(crate) fn map_status(status: u16, body: String) -> ApiError {
    match status {
        401 => ApiError::Unauthorized,
        404 => ApiError::NotFound,
        429 => ApiError::RateLimited,
        _ => ApiError::ServerError(status, body),
    }
}

/// Metadata client for the recording service.
pub struct ApiClient {
    http: Client,
    auth: Authenticator,
    base_url: String,
    page_delay: Duration,
}

impl ApiClient {
    pub fn new(credentials: Credentials) -> anyhow::Result<Self> {
        Self::with_endpoints(credentials, API_BASE_URL, TOKEN_URL)
    }

    pub fn with_endpoints(credentials: Credentials, base_url: &str, token_url: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(format!("recsync/{}", env!("RECSYNC_VERSION")))
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            auth: Authenticator::new(http.clone(), credentials, token_url),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_delay: Duration::from_millis(PAGE_DELAY_MS),
        })
    }

    /// Pause between page requests (500 ms unless overridden).
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Shared token cache, for collaborators that call the same service.
    pub fn authenticator(&self) -> Authenticator {
        self.auth.clone()
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        match self.get_once(url, query) {
            // The cached token may have been revoked server-side; retry once with a new one.
            Err(ApiError::Unauthorized) => {
                debug!("  retrying with a fresh token");
                self.auth.invalidate();
                self.get_once(url, query)
            }
            other => other,
        }
    }

    fn get_once<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let token = self.auth.access_token()?;
        debug!("GET {} {:?}", url, query);

        let start = Instant::now();
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .map_err(|e| {
                debug!("  network error after {:?}: {}", start.elapsed(), e);
                ApiError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        debug!("  response: {} in {:?}", status, start.elapsed());

        let body = response
            .text()
            .map_err(|e| ApiError::InvalidResponse(format!("failed to read body: {}", e)))?;

        if status.as_u16() != 200 {
            debug!("  error body: {}", truncate_for_log(&body, 500));
            return Err(map_status(status.as_u16(), body));
        }

        debug!("  response body: {} bytes", body.len());
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("{}\n\nResponse body:\n{}", e, truncate_for_log(&body, 500)))
        })
    }

    /// One page of a user's cloud recordings between `from` and `to` (inclusive dates).
    pub fn list_recordings(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        page_token: Option<&str>,
    ) -> Result<RecordingsPage, ApiError> {
        let url = format!("{}/users/{}/recordings", self.base_url, user_id);
        let mut query = vec![
            ("page_size", PAGE_SIZE.to_string()),
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", to.format("%Y-%m-%d").to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("next_page_token", token.to_string()));
        }
        self.get(&url, &query)
    }

    /// Every meeting for `user_id`, walking back from now in 30-day windows
    /// until the window end passes `cutoff`.
    pub fn fetch_user_meetings(&self, user_id: &str, cutoff: DateTime<Local>) -> Result<Vec<Meeting>, ApiError> {
        let mut meetings = Vec::new();
        let mut to = Local::now();

        while to >= cutoff {
            let from = to - chrono::Duration::days(WINDOW_DAYS);
            let mut page_token: Option<String> = None;
            loop {
                let page = self.list_recordings(
                    user_id,
                    from.date_naive(),
                    to.date_naive(),
                    page_token.as_deref(),
                )?;
                debug!(
                    "  {} meeting(s) for {} between {} and {}",
                    page.meetings.len(),
                    user_id,
                    from.date_naive(),
                    to.date_naive()
                );
                page_token = page.next_page().map(str::to_string);
                meetings.extend(page.meetings.into_iter().map(|m| m.into_meeting()));

                if !self.page_delay.is_zero() {
                    thread::sleep(self.page_delay);
                }
                if page_token.is_none() {
                    break;
                }
            }
            to = from;
        }

        Ok(meetings)
    }
}

impl RecordingSource for ApiClient {
    fn fetch_meetings_since(&self, account_ids: &[String], cutoff: DateTime<Local>) -> Result<Vec<Meeting>, ApiError> {
        let mut all = Vec::new();
        for user_id in account_ids {
            eprintln!("[recsync] Fetching recordings for {}...", user_id);
            let meetings = self.fetch_user_meetings(user_id, cutoff)?;
            debug!("{} meeting(s) for {}", meetings.len(), user_id);
            all.extend(meetings);
        }
        Ok(all)
    }
}
