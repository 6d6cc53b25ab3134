//! Resumable transfer of recording files from the source to the destination.
//!
//! The orchestrator talks to its collaborators through the traits below so
//! the state machine can run against in-memory fakes in tests.

#[cfg(test)]
pub(crate) mod fakes;
pub mod orchestrator;
pub mod retry;

use std::path::Path;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::api::ApiError;
use crate::db::StoreError;
use crate::download::TransferError;
use crate::drive::DriveError;
use crate::models::Meeting;

pub use orchestrator::{Orchestrator, RecordOutcome, SyncReport};
pub use retry::RetryPolicy;

/// Lists recorded meetings (with their recording files) from the source service.
pub trait RecordingSource {
    fn fetch_meetings_since(
        &self,
        account_ids: &[String],
        cutoff: DateTime<Local>,
    ) -> Result<Vec<Meeting>, ApiError>;
}

/// Fetches a remote file to a local path, returning the number of bytes written.
pub trait Downloader {
    fn download(&self, url: &str, local_path: &Path) -> Result<u64, TransferError>;
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file_id: String,
    pub name: String,
}

/// Folder-based remote storage.
pub trait Destination {
    /// Id of the folder named exactly `name` under `parent_id` (or the storage
    /// root), creating it when absent.
    fn ensure_folder(&self, name: &str, parent_id: Option<&str>) -> Result<String, DriveError>;

    fn upload_file(&self, local_path: &Path, folder_id: &str) -> Result<UploadReceipt, DriveError>;
}

/// Why a single record could not be synced.
#[derive(Debug, Error)]
pub enum RecordSyncError {
    #[error("Download failed: {0}")]
    Download(#[from] TransferError),

    #[error("Upload failed: {0}")]
    Upload(#[from] DriveError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RecordSyncError {
    /// Transfer and destination failures get another attempt; store failures
    /// mean the status can no longer be trusted and stop the run.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RecordSyncError::Store(_))
    }
}
