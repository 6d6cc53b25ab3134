//! Push stored, unsynced records to Drive.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::api::ApiClient;
use crate::cli::context::RunContext;
use crate::config::Config;
use crate::db::records::{find_candidate_meetings, reset_stalled_records};
use crate::download::{ChunkedDownloader, DEFAULT_CHUNK_SIZE};
use crate::drive::{DriveClient, DriveTokenStore};
use crate::models::{Meeting, RecordStatus};
use crate::output::format::OutputMode;
use crate::output::progress::SyncProgress;
use crate::output::table::format_sync_report;
use crate::transfer::{Destination, Downloader, Orchestrator, SyncReport};

use super::ingest::source_client;

/// Drive client for the stored authorization. Fails when `drive init` has not run.
pub fn drive_client(config: &Config) -> Result<DriveClient> {
    let app = config.drive_app()?;
    let store = DriveTokenStore::load()?;
    Ok(DriveClient::from_store(app, &store)?)
}

/// Downloader that authenticates with the source's token.
pub fn downloader_for(source: &ApiClient) -> Result<ChunkedDownloader> {
    Ok(ChunkedDownloader::new(DEFAULT_CHUNK_SIZE)?.with_auth(source.authenticator()))
}

/// Move every candidate record to the destination.
///
/// Per-record failures end up in the report. Only store failures and failing
/// to resolve the destination root folder are errors.
pub fn push(
    conn: &Connection,
    downloader: &dyn Downloader,
    destination: &dyn Destination,
    config: &Config,
    progress: &mut SyncProgress,
) -> Result<SyncReport> {
    let filter = config.record_type_filter()?;
    let cutoff = config.cutoff()?;
    let candidates = find_candidate_meetings(conn, &config.client.file_type, &filter, &cutoff)?;
    if candidates.is_empty() {
        eprintln!("[recsync] Nothing to sync");
        return Ok(SyncReport::default());
    }

    let root = destination
        .ensure_folder(&config.drive.folder_name, None)
        .with_context(|| format!("Failed to resolve Drive folder '{}'", config.drive.folder_name))?;

    let (pending, pending_bytes) = pending_records(&candidates);
    eprintln!(
        "[recsync] Syncing {} file(s) from {} meeting(s)...",
        pending,
        candidates.len()
    );
    progress.start(pending as u64, pending_bytes);

    let orchestrator = Orchestrator::new(
        conn,
        downloader,
        destination,
        &config.client.download_location,
        config.retry_policy(),
    );
    let report = orchestrator.sync_candidates(&candidates, &root, progress)?;
    progress.finish();
    Ok(report)
}

/// Count and total size of the records a sync pass will actually transfer.
/// Candidates also carry their already-synced siblings, which the
/// orchestrator skips.
fn pending_records(candidates: &[Meeting]) -> (usize, u64) {
    candidates
        .iter()
        .flat_map(|m| &m.records)
        .filter(|r| r.status != RecordStatus::Synced)
        .fold((0, 0), |(n, bytes), r| (n + 1, bytes + r.file_size.0))
}

/// Reset records a previous process left mid-transfer.
pub fn reset_stalled(conn: &Connection) -> Result<usize> {
    let n = reset_stalled_records(conn)?;
    if n > 0 {
        eprintln!("[recsync] Re-queued {} unfinished record(s)", n);
    }
    Ok(n)
}

/// `recsync sync`
pub fn run(conn: &Connection, ctx: &RunContext) -> Result<()> {
    let drive = drive_client(&ctx.config)?;
    let source = source_client(&ctx.config)?;
    let downloader = downloader_for(&source)?;

    let reset = reset_stalled(conn)?;
    let report = push(conn, &downloader, &drive, &ctx.config, &mut SyncProgress::new())?;
    print_report(&report, reset, ctx.output_mode);
    Ok(())
}

pub fn print_report(report: &SyncReport, reset: usize, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "action": "sync",
                    "reset": reset,
                    "sync": report,
                })
            );
        }
        OutputMode::Tty => println!("{}", format_sync_report(report)),
    }
}
