use colored::{ColoredString, Colorize};

use crate::db::info::DbInfo;
use crate::models::{FileSize, Meeting, RecordStatus};
use crate::naming::record_file_name;
use crate::transfer::{RecordOutcome, SyncReport};

pub fn status_label(status: RecordStatus) -> ColoredString {
    let label = format!("{:<11}", status.as_str());
    match status {
        RecordStatus::Synced => label.green(),
        RecordStatus::Failed => label.red(),
        RecordStatus::Downloading | RecordStatus::Downloaded => label.yellow(),
        RecordStatus::Queued => label.normal(),
    }
}

/// A candidate meeting and its records, for TTY display.
pub fn format_candidate(meeting: &Meeting) -> String {
    let pending = meeting
        .records
        .iter()
        .filter(|r| r.status != RecordStatus::Synced)
        .count();

    let mut lines = vec![format!(
        "{} {} {}",
        meeting.start_time.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        meeting.topic.bold(),
        format!("({} pending)", pending).dimmed()
    )];
    for record in &meeting.records {
        lines.push(format!(
            "  {} {} {}",
            status_label(record.status),
            record_file_name(record),
            record.file_size.to_string().dimmed()
        ));
    }
    lines.join("\n")
}

pub fn format_status_counts(counts: &[(RecordStatus, i64)]) -> String {
    counts
        .iter()
        .map(|(status, n)| format!("  {} {}", status_label(*status), n))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_sync_report(report: &SyncReport) -> String {
    let mut lines = vec![format!(
        "{} meeting(s): {} synced, {} skipped, {} failed",
        report.meetings,
        report.synced.to_string().green(),
        report.skipped,
        if report.failed > 0 {
            report.failed.to_string().red()
        } else {
            report.failed.to_string().normal()
        }
    )];
    for failure in &report.failures {
        if let RecordOutcome::Failed {
            record_id,
            attempts,
            error,
        } = failure
        {
            lines.push(format!(
                "  {} {} after {} attempt(s): {}",
                "✗".red(),
                record_id,
                attempts,
                error
            ));
        }
    }
    lines.join("\n")
}

pub fn format_db_info(info: &DbInfo) -> String {
    let mut lines = vec![
        format!("{} {}", "Database:".dimmed(), info.db_path.display()),
        format!(
            "{}     {} (schema v{})",
            "Size:".dimmed(),
            FileSize(info.db_size_bytes),
            info.schema_version
        ),
        format!("{} {}", "Meetings:".dimmed(), info.total_meetings),
        format!(
            "{}  {} ({} synced, {} unsynced)",
            "Records:".dimmed(),
            info.total_records,
            info.synced_records,
            info.unsynced_records
        ),
    ];
    if let (Some(earliest), Some(latest)) = (&info.earliest_meeting, &info.latest_meeting) {
        lines.push(format!("{}    {} to {}", "Range:".dimmed(), earliest, latest));
    }
    lines.join("\n")
}
