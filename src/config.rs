//! Run configuration.
//!
//! Loaded from `config.toml` (or `--config`), then overridden by `RECSYNC_*`
//! environment variables, then by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::Credentials;
use crate::drive::oauth::OAuthApp;
use crate::models::RecordTypeFilter;
use crate::transfer::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("Missing {0}. Set it in the config file or environment.")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub drive: DriveConfig,
    pub client: ClientConfig,
}

/// Server-to-server app credentials for the recording service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Users whose cloud recordings are listed.
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Top-level destination folder.
    pub folder_name: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            folder_name: "recsync".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub download_location: PathBuf,
    /// Defaults to the platform data directory.
    pub db_location: Option<PathBuf>,
    pub file_type: String,
    pub record_type: String,
    /// Unix seconds; older meetings are ignored.
    pub cutoff: i64,
    pub dry_run: bool,
    pub retry: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            download_location: PathBuf::from("/tmp"),
            db_location: None,
            file_type: "TXT".to_string(),
            record_type: "chat_file".to_string(),
            cutoff: 1_688_169_600,
            dry_run: true,
            retry: 0,
            retry_delay_ms: 0,
        }
    }
}

impl Config {
    /// Load `path`, or `config.toml` in the working directory when `None`.
    ///
    /// An explicitly named file must exist; the implicit default may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `RECSYNC_*` variables as returned by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let text = |key: &str, field: &mut String| {
            if let Some(v) = lookup(key) {
                *field = v;
            }
        };
        text("RECSYNC_ACCOUNT_ID", &mut self.source.account_id);
        text("RECSYNC_CLIENT_ID", &mut self.source.client_id);
        text("RECSYNC_CLIENT_SECRET", &mut self.source.client_secret);
        text("RECSYNC_DRIVE_CLIENT_ID", &mut self.drive.client_id);
        text("RECSYNC_DRIVE_CLIENT_SECRET", &mut self.drive.client_secret);
        text("RECSYNC_DRIVE_FOLDER", &mut self.drive.folder_name);
        text("RECSYNC_FILE_TYPE", &mut self.client.file_type);
        text("RECSYNC_RECORD_TYPE", &mut self.client.record_type);

        if let Some(ids) = lookup("RECSYNC_USER_IDS") {
            self.source.user_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("RECSYNC_DOWNLOAD_LOCATION") {
            self.client.download_location = PathBuf::from(v);
        }
        if let Some(v) = lookup("RECSYNC_DB_LOCATION") {
            self.client.db_location = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RECSYNC_CUTOFF") {
            self.client.cutoff = parse_env("RECSYNC_CUTOFF", &v)?;
        }
        if let Some(v) = lookup("RECSYNC_RETRY") {
            self.client.retry = parse_env("RECSYNC_RETRY", &v)?;
        }
        if let Some(v) = lookup("RECSYNC_RETRY_DELAY_MS") {
            self.client.retry_delay_ms = parse_env("RECSYNC_RETRY_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("RECSYNC_DRY_RUN") {
            self.client.dry_run = parse_bool("RECSYNC_DRY_RUN", &v)?;
        }
        Ok(())
    }

    pub fn source_credentials(&self) -> Result<Credentials, ConfigError> {
        let s = &self.source;
        require(&s.account_id, "source.account_id")?;
        require(&s.client_id, "source.client_id")?;
        require(&s.client_secret, "source.client_secret")?;
        Ok(Credentials {
            account_id: s.account_id.clone(),
            client_id: s.client_id.clone(),
            client_secret: s.client_secret.clone(),
        })
    }

    pub fn user_ids(&self) -> Result<&[String], ConfigError> {
        if self.source.user_ids.is_empty() {
            return Err(ConfigError::Missing("source.user_ids"));
        }
        Ok(&self.source.user_ids)
    }

    pub fn drive_app(&self) -> Result<OAuthApp, ConfigError> {
        require(&self.drive.client_id, "drive.client_id")?;
        require(&self.drive.client_secret, "drive.client_secret")?;
        Ok(OAuthApp::new(&self.drive.client_id, &self.drive.client_secret))
    }

    pub fn record_type_filter(&self) -> Result<RecordTypeFilter, ConfigError> {
        self.client
            .record_type
            .parse()
            .map_err(|message| ConfigError::Invalid {
                key: "client.record_type".to_string(),
                message,
            })
    }

    /// Cutoff as a local timestamp.
    pub fn cutoff(&self) -> Result<DateTime<Local>, ConfigError> {
        Local
            .timestamp_opt(self.client.cutoff, 0)
            .single()
            .ok_or_else(|| ConfigError::Invalid {
                key: "client.cutoff".to_string(),
                message: format!("{} is not a valid unix timestamp", self.client.cutoff),
            })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.client.retry,
            Duration::from_millis(self.client.retry_delay_ms),
        )
    }
}

fn require(value: &str, key: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(key));
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            message: format!("expected true or false, got '{}'", other),
        }),
    }
}
