//! Drive v3 client: exact-name folder lookup/creation and resumable uploads.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use serde::Deserialize;
use serde_json::json;

use super::oauth::OAuthApp;
use super::token::DriveTokenStore;
use super::{DriveError, DriveResult};
use crate::transfer::{Destination, UploadReceipt};

pub const API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
pub const UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const ROOT: &str = "root";

/// Treat access tokens as expired this long before they actually are.
const EXPIRY_MARGIN_SECS: i64 = 60;
const UPLOAD_TIMEOUT_SECS: u64 = 60 * 30;

#[derive(Deserialize, Debug)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize, Debug)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct DriveClient {
    http: Client,
    app: OAuthApp,
    refresh_token: String,
    api_base: String,
    upload_base: String,
    token: Mutex<Option<CachedToken>>,
    /// Resolved folder ids keyed by (parent, name). Also serializes resolution.
    folders: Mutex<HashMap<(Option<String>, String), String>>,
}

impl DriveClient {
    pub fn new(app: OAuthApp, refresh_token: String) -> DriveResult<Self> {
        Self::with_endpoints(app, refresh_token, API_BASE_URL, UPLOAD_BASE_URL)
    }

    pub fn with_endpoints(
        app: OAuthApp,
        refresh_token: String,
        api_base: &str,
        upload_base: &str,
    ) -> DriveResult<Self> {
        let http = Client::builder()
            .user_agent(format!("recsync/{}", env!("RECSYNC_VERSION")))
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            app,
            refresh_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
            folders: Mutex::new(HashMap::new()),
        })
    }

    /// Client for the account stored by `recsync drive init`.
    pub fn from_store(app: OAuthApp, store: &DriveTokenStore) -> DriveResult<Self> {
        match store.refresh_token.as_deref() {
            Some(token) if store.is_authorized() => Self::new(app, token.to_string()),
            _ => Err(DriveError::NotAuthorized),
        }
    }

    fn access_token(&self) -> DriveResult<String> {
        let mut cached = self.token.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(token) = cached.as_ref().filter(|t| Utc::now() < t.expires_at) {
            return Ok(token.value.clone());
        }

        debug!("Refreshing Drive access token");
        let response = self.app.refresh_access_token(&self.refresh_token)?;
        let lifetime = response.expires_in.unwrap_or(3600);
        let value = response.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(lifetime - EXPIRY_MARGIN_SECS),
        });
        Ok(value)
    }

    fn invalidate_token(&self) {
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Send an authorized request, refreshing the token once on a 401.
    fn send(&self, build: impl Fn() -> RequestBuilder) -> DriveResult<Response> {
        let response = build().bearer_auth(self.access_token()?).send()?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check(response);
        }

        debug!("  401 from Drive, refreshing token");
        self.invalidate_token();
        let response = build().bearer_auth(self.access_token()?).send()?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(DriveError::Unauthorized);
        }
        check(response)
    }

    fn find_folder(&self, name: &str, parent_id: Option<&str>) -> DriveResult<Option<String>> {
        let query = folder_query(name, parent_id);
        let url = format!("{}/files", self.api_base);
        debug!("GET {} q={}", url, query);

        let response = self.send(|| {
            self.http.get(&url).query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
                ("pageSize", "1"),
            ])
        })?;
        let list: FileList = parse_json(response)?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    fn create_folder(&self, name: &str, parent_id: Option<&str>) -> DriveResult<String> {
        let url = format!("{}/files", self.api_base);
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id.unwrap_or(ROOT)],
        });
        debug!("POST {} (folder '{}')", url, name);

        let response = self.send(|| self.http.post(&url).query(&[("fields", "id,name")]).json(&metadata))?;
        let created: DriveFile = parse_json(response)?;
        Ok(created.id)
    }

    /// Open a resumable upload session and return its URL.
    fn start_upload(&self, name: &str, folder_id: &str, size: u64) -> DriveResult<String> {
        let url = format!("{}/files", self.upload_base);
        let metadata = json!({ "name": name, "parents": [folder_id] });

        let response = self.send(|| {
            self.http
                .post(&url)
                .query(&[("uploadType", "resumable"), ("fields", "id,name")])
                .header("X-Upload-Content-Length", size)
                .json(&metadata)
        })?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| DriveError::InvalidResponse("upload session has no Location header".to_string()))
    }
}

impl Destination for DriveClient {
    fn ensure_folder(&self, name: &str, parent_id: Option<&str>) -> DriveResult<String> {
        let mut folders = self.folders.lock().unwrap_or_else(|p| p.into_inner());
        let key = (parent_id.map(str::to_string), name.to_string());
        if let Some(id) = folders.get(&key) {
            return Ok(id.clone());
        }

        let id = match self.find_folder(name, parent_id)? {
            Some(id) => id,
            None => {
                let id = self.create_folder(name, parent_id)?;
                eprintln!("[recsync] Created Drive folder '{}'", name);
                id
            }
        };
        folders.insert(key, id.clone());
        Ok(id)
    }

    fn upload_file(&self, local_path: &Path, folder_id: &str) -> DriveResult<UploadReceipt> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DriveError::Config(format!("not a file: {}", local_path.display())))?;
        let size = local_path.metadata()?.len();

        let session = self.start_upload(&name, folder_id, size)?;
        debug!("PUT {} ({} bytes)", session, size);

        let file = File::open(local_path)?;
        let response = self
            .http
            .put(&session)
            .bearer_auth(self.access_token()?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(Body::sized(file, size))
            .send()?;
        let uploaded: DriveFile = parse_json(check(response)?)?;

        Ok(UploadReceipt {
            file_id: uploaded.id,
            name: if uploaded.name.is_empty() { name } else { uploaded.name },
        })
    }
}

/// Drive search expression for a non-trashed folder named exactly `name`.
fn folder_query(name: &str, parent_id: Option<&str>) -> String {
    format!(
        "mimeType='{}' and name='{}' and '{}' in parents and trashed=false",
        FOLDER_MIME,
        escape_query(name),
        escape_query(parent_id.unwrap_or(ROOT))
    )
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn check(response: Response) -> DriveResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(DriveError::Api {
        status: status.as_u16(),
        message,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> DriveResult<T> {
    let body = response.text()?;
    serde_json::from_str(&body).map_err(|e| DriveError::InvalidResponse(format!("{}: {}", e, body)))
}
