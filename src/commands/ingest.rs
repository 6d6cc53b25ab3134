//! Fetch recordings from the source and store the ones worth syncing.

use anyhow::{Context, Result};
use log::debug;
use rusqlite::Connection;
use serde::Serialize;

use crate::api::ApiClient;
use crate::cli::context::RunContext;
use crate::config::Config;
use crate::db::meetings::{UpsertStats, upsert_meetings};
use crate::filter::select_for_ingest;
use crate::output::format::OutputMode;
use crate::transfer::RecordingSource;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct IngestSummary {
    /// Meetings returned by the source.
    pub fetched: usize,
    /// Meetings left after the cutoff and filters.
    pub selected: usize,
    #[serde(flatten)]
    pub stored: UpsertStats,
}

/// List meetings since the cutoff, keep the unique ones with records of the
/// configured extension and type, and insert whatever is not stored yet.
pub fn ingest(conn: &Connection, source: &dyn RecordingSource, config: &Config) -> Result<IngestSummary> {
    let cutoff = config.cutoff()?;
    let filter = config.record_type_filter()?;

    let mut meetings = source
        .fetch_meetings_since(config.user_ids()?, cutoff)
        .context("Failed to list recordings")?;
    let fetched = meetings.len();

    // The last window reaches up to 30 days before the cutoff.
    meetings.retain(|m| m.start_time >= cutoff);
    debug!("{} of {} meeting(s) on or after the cutoff", meetings.len(), fetched);

    let selected = select_for_ingest(&meetings, &config.client.file_type, &filter);
    let stored = upsert_meetings(conn, &selected)?;

    Ok(IngestSummary {
        fetched,
        selected: selected.len(),
        stored,
    })
}

pub fn source_client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(config.source_credentials()?)
}

/// `recsync ingest`
pub fn run(conn: &Connection, ctx: &RunContext) -> Result<()> {
    let client = source_client(&ctx.config)?;
    eprintln!("[recsync] Fetching recordings...");
    let summary = ingest(conn, &client, &ctx.config)?;
    print_summary(&summary, ctx.output_mode);
    Ok(())
}

pub fn print_summary(summary: &IngestSummary, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "action": "ingest",
                    "ingest": summary,
                })
            );
        }
        OutputMode::Tty => {
            println!("{}", summary_line(summary));
        }
    }
}

pub fn summary_line(summary: &IngestSummary) -> String {
    format!(
        "Ingested {} of {} meeting(s): {} new meeting(s), {} new record(s)",
        summary.selected, summary.fetched, summary.stored.meetings_inserted, summary.stored.records_inserted
    )
}
