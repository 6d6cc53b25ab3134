//! Filesystem-safe names derived from meeting metadata.
//!
//! The same folder name is used for the local scratch directory and for the
//! destination subfolder, so both sides stay in step across runs.

use std::path::{Path, PathBuf};

use crate::models::{Meeting, Record};

/// Longest name most filesystems accept for a single path component.
pub const MAX_NAME_LEN: usize = 255;

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make `raw` safe to use as a single path component.
///
/// Removes control characters and `<>:"/\|?*` and leading whitespace,
/// truncates to [`MAX_NAME_LEN`] characters, then strips trailing dots and
/// whitespace. Applying it twice gives the same result as once.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !FORBIDDEN.contains(c))
        .collect();

    let truncated: String = cleaned.trim_start().chars().take(MAX_NAME_LEN).collect();
    truncated
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// `{sanitized topic} - {dd-mm-YYYY} - {meeting id}`
pub fn meeting_folder_name(meeting: &Meeting) -> String {
    format!(
        "{} - {} - {}",
        sanitize_name(&meeting.topic),
        meeting.start_time.format("%d-%m-%Y"),
        meeting.id
    )
}

/// `{record type}.{lowercased extension}`
pub fn record_file_name(record: &Record) -> String {
    sanitize_name(&format!(
        "{}.{}",
        record.record_type,
        record.file_extension.to_lowercase()
    ))
}

pub fn local_folder(download_root: &Path, meeting: &Meeting) -> PathBuf {
    download_root.join(meeting_folder_name(meeting))
}
