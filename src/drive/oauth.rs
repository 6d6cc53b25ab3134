//! OAuth PKCE flow for Google Drive authorization.
//!
//! The browser redirects back to a loopback listener on a random port; the
//! authorization code it carries is exchanged for a refresh token.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use log::debug;
use rand::{RngCore, rngs::OsRng};
use reqwest::Url;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{DriveError, DriveResult};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Files created by this app only.
const SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const REDIRECT_TIMEOUT_SECS: u64 = 300;

/// PKCE verifier/challenge pair for OAuth flow.
#[derive(Debug)]
pub struct PkceChallenge {
    /// Random verifier string (sent during token exchange)
    pub verifier: String,
    /// SHA256 hash of verifier (sent during authorization)
    pub challenge: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 64];
        OsRng.fill_bytes(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);

        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

        Self { verifier, challenge }
    }
}

/// Authorization URL for the user to visit.
pub fn build_auth_url(client_id: &str, redirect_uri: &str, challenge: &str) -> DriveResult<String> {
    let url = Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", SCOPE),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| DriveError::OAuth(format!("build auth url: {}", e)))?;
    Ok(url.into())
}

/// Response from token endpoint.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct TokenError {
    error: String,
    error_description: Option<String>,
}

/// Where the token endpoint lives and which app is asking.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl OAuthApp {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Exchange an authorization code for tokens.
    pub fn exchange_code(&self, code: &str, verifier: &str, redirect_uri: &str) -> DriveResult<TokenResponse> {
        self.post_token(&[
            ("code", code),
            ("grant_type", "authorization_code"),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
    }

    /// Trade the long-lived refresh token for a new access token.
    pub fn refresh_access_token(&self, refresh_token: &str) -> DriveResult<TokenResponse> {
        self.post_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ])
    }

    fn post_token(&self, params: &[(&str, &str)]) -> DriveResult<TokenResponse> {
        debug!("POST {}", self.token_url);
        let response = reqwest::blocking::Client::new()
            .post(&self.token_url)
            .form(params)
            .send()
            .map_err(|e| DriveError::OAuth(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| DriveError::OAuth(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<TokenError>(&body) {
                return Err(DriveError::OAuth(err.error_description.unwrap_or(err.error)));
            }
            return Err(DriveError::OAuth(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body).map_err(|e| DriveError::OAuth(format!("parse response: {}", e)))
    }
}

/// Loopback listener that receives the browser redirect.
pub struct RedirectListener {
    listener: TcpListener,
    port: u16,
}

impl RedirectListener {
    pub fn bind() -> DriveResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Block until the browser hits the redirect URI, returning the code.
    pub fn wait_for_code(&self) -> DriveResult<String> {
        let (mut stream, _) = self.listener.accept()?;
        stream.set_read_timeout(Some(Duration::from_secs(REDIRECT_TIMEOUT_SECS)))?;

        let mut buffer = [0u8; 4096];
        let n = stream.read(&mut buffer)?;
        let request = String::from_utf8_lossy(&buffer[..n]);
        let request_line = request.lines().next().unwrap_or_default();

        match parse_redirect(request_line) {
            Ok(code) => {
                send_response(&mut stream, "Authorization complete. You can close this tab.");
                Ok(code)
            }
            Err(e) => {
                send_response(&mut stream, "Authorization failed. You can close this tab.");
                Err(e)
            }
        }
    }
}

/// Extract `code` from a request line like `GET /?code=xxx&scope=... HTTP/1.1`.
fn parse_redirect(request_line: &str) -> DriveResult<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| DriveError::OAuth("malformed redirect request".to_string()))?;
    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| DriveError::OAuth(format!("malformed redirect: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => return Err(DriveError::OAuth(format!("authorization denied: {}", value))),
            _ => {}
        }
    }
    code.ok_or_else(|| DriveError::OAuth("no authorization code in redirect".to_string()))
}

fn send_response(stream: &mut impl Write, message: &str) {
    let body = format!(
        "<html><body style=\"font-family: system-ui; text-align: center; padding: 40px;\"><h2>{}</h2></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
