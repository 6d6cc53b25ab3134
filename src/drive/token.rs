//! Persisted Drive authorization.
//!
//! Stores the refresh token in `{data_dir}/drive.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DriveError, DriveResult};
use crate::platform::data_dir;

#[derive(Serialize, Deserialize, Default, Debug)]
pub struct DriveTokenStore {
    /// OAuth refresh token (long-lived)
    pub refresh_token: Option<String>,

    /// Unix timestamp of the last successful authorization
    pub authorized_at: Option<i64>,

    #[serde(skip)]
    path: PathBuf,
}

impl DriveTokenStore {
    /// Load from the default location.
    pub fn load() -> DriveResult<Self> {
        Self::load_from(&default_path()?)
    }

    /// Load from `path`, returning an empty store if the file doesn't exist.
    pub fn load_from(path: &Path) -> DriveResult<Self> {
        let mut store = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| DriveError::Config(format!("read: {}", e)))?;
            toml::from_str(&content).map_err(|e| DriveError::Config(format!("parse: {}", e)))?
        } else {
            Self::default()
        };
        store.path = path.to_path_buf();
        Ok(store)
    }

    /// Write atomically with owner-only permissions.
    pub fn save(&self) -> DriveResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| DriveError::Config(format!("serialize: {}", e)))?;

        let temp_path = self.path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    pub fn is_authorized(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = Some(token);
        self.authorized_at = Some(chrono::Utc::now().timestamp());
    }

    pub fn clear(&mut self) {
        self.refresh_token = None;
        self.authorized_at = None;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn default_path() -> DriveResult<PathBuf> {
    let dir = data_dir().map_err(|e| DriveError::Config(e.to_string()))?;
    Ok(dir.join("drive.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_unauthorized() {
        let dir = TempDir::new().unwrap();
        let store = DriveTokenStore::load_from(&dir.path().join("drive.toml")).unwrap();
        assert!(!store.is_authorized());
        assert!(store.authorized_at.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("drive.toml");

        let mut store = DriveTokenStore::load_from(&path).unwrap();
        store.set_refresh_token("1//refresh".to_string());
        store.save().unwrap();

        let loaded = DriveTokenStore::load_from(&path).unwrap();
        assert!(loaded.is_authorized());
        assert_eq!(loaded.refresh_token.as_deref(), Some("1//refresh"));
        assert!(loaded.authorized_at.is_some());
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drive.toml");
        let mut store = DriveTokenStore::load_from(&path).unwrap();
        store.set_refresh_token("tok".to_string());
        store.save().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_clear() {
        let mut store = DriveTokenStore::default();
        store.set_refresh_token("tok".to_string());
        assert!(store.is_authorized());
        store.clear();
        assert!(!store.is_authorized());
    }

    #[test]
    fn test_empty_token_is_unauthorized() {
        let store: DriveTokenStore = toml::from_str("refresh_token = \"\"").unwrap();
        assert!(!store.is_authorized());
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drive.toml");
        fs::write(&path, "refresh_token = [").unwrap();
        assert!(matches!(DriveTokenStore::load_from(&path), Err(DriveError::Config(_))));
    }
}
