//! In-memory collaborators for exercising the sync pipeline without a network.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::{Destination, Downloader, RecordingSource, UploadReceipt};
use crate::api::ApiError;
use crate::download::TransferError;
use crate::drive::DriveError;
use crate::models::Meeting;

/// Returns a fixed listing, or `Unauthorized` when `reject` is set.
#[derive(Default)]
pub struct FakeSource {
    pub meetings: Vec<Meeting>,
    pub reject: bool,
    pub requested: RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn with(meetings: Vec<Meeting>) -> Self {
        Self {
            meetings,
            ..Self::default()
        }
    }
}

impl RecordingSource for FakeSource {
    fn fetch_meetings_since(&self, account_ids: &[String], _cutoff: DateTime<Local>) -> Result<Vec<Meeting>, ApiError> {
        self.requested.borrow_mut().extend(account_ids.iter().cloned());
        if self.reject {
            return Err(ApiError::Unauthorized);
        }
        Ok(self.meetings.clone())
    }
}

/// Writes a small file, or fails the first `fail_times` calls.
pub struct FakeDownloader {
    pub fail_times: Cell<u32>,
    pub calls: Cell<u32>,
    pub seen_paths: RefCell<Vec<PathBuf>>,
}

impl FakeDownloader {
    pub fn ok() -> Self {
        Self::failing(0)
    }

    pub fn failing(times: u32) -> Self {
        Self {
            fail_times: Cell::new(times),
            calls: Cell::new(0),
            seen_paths: RefCell::new(Vec::new()),
        }
    }
}

impl Downloader for FakeDownloader {
    fn download(&self, url: &str, local_path: &Path) -> Result<u64, TransferError> {
        self.calls.set(self.calls.get() + 1);
        self.seen_paths.borrow_mut().push(local_path.to_path_buf());
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.fail_times.get() > 0 {
            self.fail_times.set(self.fail_times.get() - 1);
            fs::write(local_path, b"partial")?;
            return Err(TransferError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        fs::write(local_path, b"recording bytes")?;
        Ok(15)
    }
}

/// Records folders and uploads in memory.
#[derive(Default)]
pub struct FakeDestination {
    pub folders: RefCell<HashMap<(Option<String>, String), String>>,
    pub uploads: RefCell<Vec<(String, String, Vec<u8>)>>,
    pub fail_uploads: Cell<u32>,
}

impl Destination for FakeDestination {
    fn ensure_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String, DriveError> {
        let mut folders = self.folders.borrow_mut();
        let next = format!("folder-{}", folders.len() + 1);
        Ok(folders
            .entry((parent_id.map(str::to_string), name.to_string()))
            .or_insert(next)
            .clone())
    }

    fn upload_file(&self, local_path: &Path, folder_id: &str) -> Result<UploadReceipt, DriveError> {
        if self.fail_uploads.get() > 0 {
            self.fail_uploads.set(self.fail_uploads.get() - 1);
            return Err(DriveError::Api {
                status: 500,
                message: "backend error".to_string(),
            });
        }
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let body = fs::read(local_path)?;
        let mut uploads = self.uploads.borrow_mut();
        uploads.push((folder_id.to_string(), name.clone(), body));
        Ok(UploadReceipt {
            file_id: format!("file-{}", uploads.len()),
            name,
        })
    }
}
