//! `recsync status`: what the next sync pass would do.

use anyhow::Result;
use colored::Colorize;
use rusqlite::Connection;

use crate::cli::context::RunContext;
use crate::config::Config;
use crate::db::records::{count_by_status, count_unsynced, find_candidate_meetings};
use crate::output::format::OutputMode;
use crate::output::json::{CandidateJson, StatusJson, status_counts_map, to_json};
use crate::output::table::{format_candidate, format_status_counts};

pub fn build_status(conn: &Connection, config: &Config, limit: usize) -> Result<StatusJson> {
    let filter = config.record_type_filter()?;
    let cutoff = config.cutoff()?;
    let ext = &config.client.file_type;

    let unsynced = count_unsynced(conn, ext, &filter, &cutoff)?;
    let by_status = count_by_status(conn, ext, &filter)?;
    let candidates = find_candidate_meetings(conn, ext, &filter, &cutoff)?;

    Ok(StatusJson {
        file_type: ext.clone(),
        record_type: filter.to_string(),
        cutoff: cutoff.format("%Y-%m-%d %H:%M:%S").to_string(),
        unsynced,
        by_status: status_counts_map(&by_status),
        candidates: candidates.iter().take(limit).map(CandidateJson::from_meeting).collect(),
    })
}

pub fn run(conn: &Connection, ctx: &RunContext, limit: usize) -> Result<()> {
    let config = &ctx.config;
    match ctx.output_mode {
        OutputMode::Json => {
            println!("{}", to_json(&build_status(conn, config, limit)?));
        }
        OutputMode::Tty => {
            let filter = config.record_type_filter()?;
            let cutoff = config.cutoff()?;
            let ext = &config.client.file_type;

            println!(
                "{} .{} / {} since {}",
                "Filter:".dimmed(),
                ext,
                filter,
                cutoff.format("%Y-%m-%d")
            );
            println!("{}", format_status_counts(&count_by_status(conn, ext, &filter)?));

            let unsynced = count_unsynced(conn, ext, &filter, &cutoff)?;
            if unsynced == 0 {
                println!("\nEverything is synced.");
                return Ok(());
            }

            let candidates = find_candidate_meetings(conn, ext, &filter, &cutoff)?;
            println!("\n{} record(s) pending in {} meeting(s):", unsynced, candidates.len());
            for meeting in candidates.iter().take(limit) {
                println!("{}", format_candidate(meeting));
            }
            if candidates.len() > limit {
                println!("{}", format!("... and {} more", candidates.len() - limit).dimmed());
            }
        }
    }
    Ok(())
}
