//! `recsync run`: reset stalled records, ingest, then sync.

use anyhow::Result;
use log::debug;
use rusqlite::Connection;
use serde::Serialize;

use crate::cli::context::RunContext;
use crate::config::Config;
use crate::output::format::OutputMode;
use crate::output::progress::SyncProgress;
use crate::output::table::format_sync_report;
use crate::transfer::{Destination, Downloader, RecordingSource, SyncReport};

use super::ingest::{self, IngestSummary, source_client};
use super::sync::{downloader_for, drive_client, push, reset_stalled};

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    pub reset: usize,
    pub ingest: IngestSummary,
    /// Absent on a dry run.
    pub sync: Option<SyncReport>,
}

/// One full pass. `transfer` is `None` for a dry run.
pub fn run_once(
    conn: &Connection,
    source: &dyn RecordingSource,
    transfer: Option<(&dyn Downloader, &dyn Destination)>,
    config: &Config,
    progress: &mut SyncProgress,
) -> Result<RunSummary> {
    let reset = reset_stalled(conn)?;
    let ingest = ingest::ingest(conn, source, config)?;
    eprintln!("[recsync] {}", ingest::summary_line(&ingest));

    let sync = match transfer {
        Some((downloader, destination)) => Some(push(conn, downloader, destination, config, progress)?),
        None => {
            debug!("Dry run: skipping downloads and uploads");
            None
        }
    };

    Ok(RunSummary {
        dry_run: transfer.is_none(),
        reset,
        ingest,
        sync,
    })
}

pub fn run(conn: &Connection, ctx: &RunContext) -> Result<()> {
    let config = &ctx.config;
    let source = source_client(config)?;

    let summary = if config.client.dry_run {
        eprintln!("[recsync] Dry run: recordings are listed and stored, not transferred");
        run_once(conn, &source, None, config, &mut SyncProgress::hidden())?
    } else {
        // Check Drive authorization before touching anything.
        let drive = drive_client(config)?;
        let downloader = downloader_for(&source)?;
        run_once(
            conn,
            &source,
            Some((&downloader, &drive)),
            config,
            &mut SyncProgress::new(),
        )?
    };

    print_summary(&summary, ctx.output_mode);
    Ok(())
}

fn print_summary(summary: &RunSummary, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            let mut value = serde_json::to_value(summary).unwrap_or_default();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("action".to_string(), "run".into());
            }
            println!("{}", value);
        }
        OutputMode::Tty => match &summary.sync {
            Some(report) => println!("{}", format_sync_report(report)),
            None => println!("Dry run complete. Set dry_run = false or pass --no-dry-run to upload."),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::commands::test_support::test_config;
    use crate::db::meetings::upsert_meeting;
    use crate::db::records::{get_record, set_record_status};
    use crate::db::schema::test_db;
    use crate::db::test_fixtures::{at, standup};
    use crate::models::RecordStatus;
    use crate::transfer::fakes::{FakeDestination, FakeDownloader, FakeSource};

    #[test]
    fn test_dry_run_ingests_without_transfer() {
        let conn = test_db();
        let tmp = TempDir::new().unwrap();
        let source = FakeSource::with(vec![standup("m1", at(3, 9))]);

        let summary = run_once(&conn, &source, None, &test_config(tmp.path()), &mut SyncProgress::hidden()).unwrap();
        assert!(summary.dry_run);
        assert!(summary.sync.is_none());
        assert_eq!(summary.ingest.stored.records_inserted, 1);
        assert_eq!(get_record(&conn, "m1-chat").unwrap().status, RecordStatus::Queued);
    }

    #[test]
    fn test_full_run_resets_ingests_and_syncs() {
        let conn = test_db();
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());

        // Left behind by a crashed process.
        upsert_meeting(&conn, &standup("m0", at(2, 9))).unwrap();
        set_record_status(&conn, "m0-chat", RecordStatus::Downloading).unwrap();

        let source = FakeSource::with(vec![standup("m1", at(3, 9))]);
        let downloader = FakeDownloader::ok();
        let destination = FakeDestination::default();

        let summary = run_once(
            &conn,
            &source,
            Some((&downloader, &destination)),
            &config,
            &mut SyncProgress::hidden(),
        )
        .unwrap();

        assert!(!summary.dry_run);
        assert_eq!(summary.reset, 1);
        let report = summary.sync.unwrap();
        assert_eq!(report.synced, 2);
        assert_eq!(get_record(&conn, "m0-chat").unwrap().status, RecordStatus::Synced);
        assert_eq!(get_record(&conn, "m1-chat").unwrap().status, RecordStatus::Synced);
    }

    #[test]
    fn test_second_run_uploads_nothing() {
        let conn = test_db();
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let source = FakeSource::with(vec![standup("m1", at(3, 9))]);
        let downloader = FakeDownloader::ok();
        let destination = FakeDestination::default();

        for _ in 0..2 {
            run_once(
                &conn,
                &source,
                Some((&downloader, &destination)),
                &config,
                &mut SyncProgress::hidden(),
            )
            .unwrap();
        }
        assert_eq!(downloader.calls.get(), 1);
        assert_eq!(destination.uploads.borrow().len(), 1);
    }

    #[test]
    fn test_summary_serializes_with_null_sync_on_dry_run() {
        let summary = RunSummary {
            dry_run: true,
            reset: 0,
            ingest: IngestSummary::default(),
            sync: None,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value["sync"].is_null());
        assert_eq!(value["ingest"]["records_inserted"], 0);
    }
}
