//! Server-to-server OAuth for the recording service.
//!
//! Tokens are requested with the `account_credentials` grant and cached until
//! five minutes before they expire. The cache is shared between the metadata
//! client and the downloader, so one token serves both.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::client::{map_status, ApiError};

pub const TOKEN_URL: &str = "https://zoom.us/oauth/token";

/// Refresh this long before the server-side expiry.
const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            value: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in)
                - Duration::seconds(EXPIRY_MARGIN_SECS),
        }
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

struct Inner {
    http: Client,
    credentials: Credentials,
    token_url: String,
    token: Mutex<Option<AccessToken>>,
}

/// Cheap to clone; clones share one token cache.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<Inner>,
}

impl Authenticator {
    pub fn new(http: Client, credentials: Credentials, token_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                credentials,
                token_url: token_url.into(),
                token: Mutex::new(None),
            }),
        }
    }

    /// A valid bearer token, requesting a new one when the cached token is
    /// missing or about to expire.
    pub fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self
            .inner
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        let token = self.request_token()?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn request_token(&self) -> Result<AccessToken, ApiError> {
        let creds = &self.inner.credentials;
        debug!("POST {} (account {})", self.inner.token_url, creds.account_id);

        let response = self
            .inner
            .http
            .post(&self.inner.token_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[
                ("grant_type", "account_credentials"),
                ("account_id", creds.account_id.as_str()),
            ])
            .send()
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().unwrap_or_default();
            debug!("  token request failed ({}): {}", status, body);
            // A rejected credential set comes back as 400 as well as 401.
            return Err(match status {
                400 | 401 | 403 => ApiError::Unauthorized,
                _ => map_status(status, body),
            });
        }

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| ApiError::InvalidResponse(format!("token response: {}", e)))?;
        debug!(
            "  got {} token, expires in {}s",
            parsed.token_type.as_deref().unwrap_or("access"),
            parsed.expires_in
        );
        Ok(AccessToken::from_response(parsed, Utc::now()))
    }

    /// Drop the cached token so the next call requests a new one.
    pub fn invalidate(&self) {
        *self
            .inner
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: i64) -> TokenResponse {
        TokenResponse {
            access_token: "tok".to_string(),
            expires_in,
            token_type: Some("bearer".to_string()),
        }
    }

    #[test]
    fn test_expiry_includes_margin() {
        let now = Utc::now();
        let token = AccessToken::from_response(response(3600), now);
        assert_eq!(token.expires_at, now + Duration::seconds(3600 - EXPIRY_MARGIN_SECS));
        assert!(token.is_fresh(now));
        assert!(!token.is_fresh(now + Duration::seconds(3600 - EXPIRY_MARGIN_SECS)));
    }

    #[test]
    fn test_short_lived_token_is_never_fresh() {
        let now = Utc::now();
        let token = AccessToken::from_response(response(60), now);
        assert!(!token.is_fresh(now));
    }

    #[test]
    fn test_token_response_parses() {
        let parsed: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"bearer","expires_in":3599,"scope":"recording:read"}"#,
        )
        .unwrap();
        assert_eq!(parsed.access_token, "abc");
        assert_eq!(parsed.expires_in, 3599);
    }
}
