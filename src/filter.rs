//! Pure filters that reduce a fetched meeting list before it is stored.
//!
//! Every function preserves input order and returns a new vector; the caller's
//! list is never touched.

use std::collections::HashSet;

use crate::models::{Meeting, Record, RecordTypeFilter};

/// Keep the first meeting for each `(start time in unix seconds, meeting id)`.
///
/// Overlapping source windows can report the same instance twice.
pub fn filter_unique_by_start_time_and_id(meetings: &[Meeting]) -> Vec<Meeting> {
    let mut seen = HashSet::new();
    meetings
        .iter()
        .filter(|m| seen.insert((m.start_time.timestamp(), m.id)))
        .cloned()
        .collect()
}

/// Narrow each meeting to records whose extension equals `ext` exactly;
/// drop meetings left with none.
pub fn filter_by_file_extension(meetings: &[Meeting], ext: &str) -> Vec<Meeting> {
    meetings
        .iter()
        .filter_map(|m| {
            let records: Vec<Record> = m
                .records
                .iter()
                .filter(|r| r.file_extension == ext)
                .cloned()
                .collect();
            (!records.is_empty()).then(|| m.with_records(records))
        })
        .collect()
}

/// Narrow each meeting to its first record matching `filter`; drop meetings
/// with no match.
///
/// Only the first match is kept even when several records share the type.
pub fn filter_by_record_type(meetings: &[Meeting], filter: &RecordTypeFilter) -> Vec<Meeting> {
    meetings
        .iter()
        .filter_map(|m| {
            m.records
                .iter()
                .find(|r| filter.matches(&r.record_type))
                .map(|r| m.with_records(vec![r.clone()]))
        })
        .collect()
}

/// Ingestion pipeline: dedup, then extension, then type. The type step is
/// skipped for the `all` wildcard so every matching record gets stored.
pub fn select_for_ingest(meetings: &[Meeting], ext: &str, filter: &RecordTypeFilter) -> Vec<Meeting> {
    let unique = filter_unique_by_start_time_and_id(meetings);
    log::debug!("{} unique meeting(s) of {}", unique.len(), meetings.len());

    let by_ext = filter_by_file_extension(&unique, ext);
    log::debug!("{} meeting(s) with .{} records", by_ext.len(), ext);

    match filter {
        RecordTypeFilter::All => by_ext,
        RecordTypeFilter::Only(_) => {
            let by_type = filter_by_record_type(&by_ext, filter);
            log::debug!("{} meeting(s) with {} records", by_type.len(), filter);
            by_type
        }
    }
}
