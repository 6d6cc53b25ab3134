//! Per-record sync state machine.
//!
//! ```text
//! queued -> downloading -> downloaded -> synced
//!                |               |
//!                +---> failed <--+
//! ```
//!
//! Every transition is written to the record store before the next phase
//! starts. A crash mid-record leaves `downloading` or `downloaded` behind; the
//! startup stall reset turns those back into `queued`. Nothing here remembers
//! status between calls.

use std::fs;
use std::path::PathBuf;

use log::{debug, warn};
use rusqlite::Connection;
use serde::Serialize;

use super::retry::{self, RetryError, RetryPolicy};
use super::{Destination, Downloader, RecordSyncError, UploadReceipt};
use crate::db::records::{set_record_path, set_record_status};
use crate::db::StoreError;
use crate::models::{Meeting, Record, RecordStatus};
use crate::naming::{local_folder, meeting_folder_name, record_file_name};
use crate::output::progress::SyncProgress;

/// Removes the local scratch folder when dropped.
struct ScratchDir(PathBuf);

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = fs::remove_dir_all(&self.0) {
                warn!("Failed to remove {}: {}", self.0.display(), e);
            }
        }
    }
}

/// What happened to one record during a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RecordOutcome {
    Synced { record_id: String, file_id: String },
    Skipped { record_id: String },
    Failed { record_id: String, attempts: u32, error: String },
}

/// Totals for a sync pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub meetings: usize,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<RecordOutcome>,
}

impl SyncReport {
    fn add(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Synced { .. } => self.synced += 1,
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Failed { .. } => {
                self.failed += 1;
                self.failures.push(outcome);
            }
        }
    }
}

pub struct Orchestrator<'a> {
    conn: &'a Connection,
    downloader: &'a dyn Downloader,
    destination: &'a dyn Destination,
    download_root: PathBuf,
    policy: RetryPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        conn: &'a Connection,
        downloader: &'a dyn Downloader,
        destination: &'a dyn Destination,
        download_root: impl Into<PathBuf>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            conn,
            downloader,
            destination,
            download_root: download_root.into(),
            policy,
        }
    }

    /// One attempt at moving `record` to the destination.
    ///
    /// On success the record is `synced`. On a transfer or upload failure the
    /// record is `failed` and the error is returned. The local copy is removed
    /// either way.
    pub fn sync_record(
        &self,
        meeting: &Meeting,
        record: &Record,
        folder_id: &str,
    ) -> Result<UploadReceipt, RecordSyncError> {
        set_record_status(self.conn, &record.id, RecordStatus::Downloading)?;

        let folder = local_folder(&self.download_root, meeting);
        let local_path = folder.join(record_file_name(record));
        let scratch = ScratchDir(folder);

        debug!("Downloading {} to {}", record.id, local_path.display());
        if let Err(e) = self.downloader.download(&record.download_url, &local_path) {
            // Partial folder goes with `scratch`.
            drop(scratch);
            set_record_status(self.conn, &record.id, RecordStatus::Failed)?;
            return Err(e.into());
        }

        set_record_status(self.conn, &record.id, RecordStatus::Downloaded)?;
        set_record_path(self.conn, &record.id, Some(local_path.to_string_lossy().as_ref()))?;

        let uploaded = self
            .destination
            .ensure_folder(&meeting_folder_name(meeting), Some(folder_id))
            .and_then(|subfolder_id| self.destination.upload_file(&local_path, &subfolder_id));

        drop(scratch);
        set_record_path(self.conn, &record.id, None)?;

        match uploaded {
            Ok(receipt) => {
                set_record_status(self.conn, &record.id, RecordStatus::Synced)?;
                debug!("Synced {} as {}", record.id, receipt.file_id);
                Ok(receipt)
            }
            Err(e) => {
                set_record_status(self.conn, &record.id, RecordStatus::Failed)?;
                Err(e.into())
            }
        }
    }

    /// Sync every record of `meeting` with bounded retry. Only store failures
    /// are returned as errors; exhausted records are reported as `Failed`.
    pub fn sync_meeting(
        &self,
        meeting: &Meeting,
        folder_id: &str,
        progress: &mut SyncProgress,
    ) -> Result<Vec<RecordOutcome>, StoreError> {
        let mut outcomes = Vec::with_capacity(meeting.records.len());

        for record in &meeting.records {
            if record.status == RecordStatus::Synced {
                debug!("Skipping {} (already synced)", record.id);
                outcomes.push(RecordOutcome::Skipped {
                    record_id: record.id.clone(),
                });
                continue;
            }

            progress.println(&format!(
                "  {} ({}, {})",
                record_file_name(record),
                record.file_size,
                record.id
            ));

            let result = retry::run(&self.policy, RecordSyncError::is_retryable, |attempt| {
                if attempt > 1 {
                    debug!("Retrying {} (attempt {})", record.id, attempt);
                }
                self.sync_record(meeting, record, folder_id).inspect_err(|e| {
                    warn!("{} attempt {} failed: {}", record.id, attempt, e);
                })
            });

            let outcome = match result {
                Ok(receipt) => RecordOutcome::Synced {
                    record_id: record.id.clone(),
                    file_id: receipt.file_id,
                },
                Err(RetryError::Fatal {
                    error: RecordSyncError::Store(e),
                    ..
                }) => {
                    progress.finish();
                    return Err(e);
                }
                Err(RetryError::Fatal { attempts, error }) => RecordOutcome::Failed {
                    record_id: record.id.clone(),
                    attempts,
                    error: error.to_string(),
                },
                Err(RetryError::Exhausted { attempts, last }) => {
                    progress.println(&format!("  -> Failed after {} attempt(s): {}", attempts, last));
                    RecordOutcome::Failed {
                        record_id: record.id.clone(),
                        attempts,
                        error: last.to_string(),
                    }
                }
            };
            progress.record_done(record.file_size.0);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Drive every candidate meeting, in the order given.
    pub fn sync_candidates(
        &self,
        meetings: &[Meeting],
        folder_id: &str,
        progress: &mut SyncProgress,
    ) -> Result<SyncReport, StoreError> {
        let mut report = SyncReport::default();
        let total = meetings.len();

        for (i, meeting) in meetings.iter().enumerate() {
            progress.println(&format!(
                "[{}/{}] {} ({})",
                i + 1,
                total,
                meeting.topic,
                meeting.start_time.format("%Y-%m-%d %H:%M")
            ));
            for outcome in self.sync_meeting(meeting, folder_id, progress)? {
                if let RecordOutcome::Failed { record_id, error, .. } = &outcome {
                    warn!("Giving up on {} from '{}': {}", record_id, meeting.topic, error);
                }
                report.add(outcome);
            }
            report.meetings += 1;
        }

        Ok(report)
    }
}
