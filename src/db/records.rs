//! Record status tracking and candidate selection.
//!
//! The orchestrator persists every phase transition through
//! [`set_record_status`] before moving on, so the stored status is always the
//! source of truth for what is left to do.

use chrono::{DateTime, Local};
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::{Connection, OptionalExtension, params};

use super::meetings::{read_meeting_row, row_to_meeting};
use super::{StoreError, StoreResult, format_time, parse_time};
use crate::models::{FileSize, Meeting, Record, RecordStatus, RecordType, RecordTypeFilter};

impl ToSql for RecordStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

pub(crate) const RECORD_COLUMNS: &str =
    "id, meeting_id, type, start_time, file_extension, file_size, download_url, play_url, status, path";

pub(crate) struct RecordRow {
    id: String,
    meeting_id: String,
    record_type: String,
    start_time: String,
    file_extension: String,
    file_size: i64,
    download_url: String,
    play_url: String,
    status: String,
    path: Option<String>,
}

impl RecordRow {
    pub(crate) fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
        Ok(RecordRow {
            id: row.get(0)?,
            meeting_id: row.get(1)?,
            record_type: row.get(2)?,
            start_time: row.get(3)?,
            file_extension: row.get(4)?,
            file_size: row.get(5)?,
            download_url: row.get(6)?,
            play_url: row.get(7)?,
            status: row.get(8)?,
            path: row.get(9)?,
        })
    }
}

pub(crate) fn row_to_record(row: RecordRow) -> StoreResult<Record> {
    let status = row
        .status
        .parse::<RecordStatus>()
        .map_err(|e| StoreError::InvalidValue {
            column: "records.status",
            message: e.to_string(),
        })?;
    Ok(Record {
        id: row.id,
        meeting_id: row.meeting_id,
        record_type: RecordType::from(row.record_type),
        start_time: parse_time("records.start_time", &row.start_time)?,
        file_extension: row.file_extension,
        file_size: FileSize(row.file_size.max(0) as u64),
        download_url: row.download_url,
        play_url: row.play_url,
        status,
        file_path: row.path,
    })
}

pub fn get_record(conn: &Connection, record_id: &str) -> StoreResult<Record> {
    let sql = format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS);
    let row = conn
        .query_row(&sql, [record_id], RecordRow::read)
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            kind: "Record",
            id: record_id.to_string(),
        })?;
    row_to_record(row)
}

/// Meetings that still have work to do: start time at or after `cutoff` and at
/// least one non-synced record matching the extension and type filter.
///
/// Meetings come newest first. Each carries only its matching records, in
/// insertion order, including any that are already synced; the orchestrator
/// skips those by status.
pub fn find_candidate_meetings(
    conn: &Connection,
    file_extension: &str,
    record_type: &RecordTypeFilter,
    cutoff: &DateTime<Local>,
) -> StoreResult<Vec<Meeting>> {
    let type_param = record_type.as_type();

    let mut stmt = conn.prepare(
        "SELECT m.uuid, m.id, m.topic, m.start_time
         FROM meetings m
         WHERE m.start_time >= ?1
           AND EXISTS (
               SELECT 1 FROM records r
               WHERE r.meeting_id = m.uuid
                 AND r.status != 'synced'
                 AND r.file_extension = ?2
                 AND (?3 IS NULL OR r.type = ?3)
           )
         ORDER BY m.start_time DESC, m.rowid",
    )?;
    let meeting_rows = stmt
        .query_map(
            params![format_time(cutoff), file_extension, type_param],
            read_meeting_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let record_sql = format!(
        "SELECT {} FROM records
         WHERE meeting_id = ?1 AND file_extension = ?2 AND (?3 IS NULL OR type = ?3)
         ORDER BY rowid",
        RECORD_COLUMNS
    );
    let mut record_stmt = conn.prepare(&record_sql)?;

    let mut meetings = Vec::with_capacity(meeting_rows.len());
    for row in meeting_rows {
        let records = record_stmt
            .query_map(params![&row.uuid, file_extension, type_param], RecordRow::read)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(row_to_record)
            .collect::<StoreResult<Vec<_>>>()?;
        meetings.push(row_to_meeting(row, records)?);
    }
    Ok(meetings)
}

/// Overwrite a record's status. No transition validation happens here.
pub fn set_record_status(conn: &Connection, record_id: &str, status: RecordStatus) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE records SET status = ?1 WHERE id = ?2",
        params![status, record_id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            kind: "Record",
            id: record_id.to_string(),
        });
    }
    Ok(())
}

/// Remember (or clear) where a record's file was materialized locally.
pub fn set_record_path(conn: &Connection, record_id: &str, path: Option<&str>) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE records SET path = ?1 WHERE id = ?2",
        params![path, record_id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            kind: "Record",
            id: record_id.to_string(),
        });
    }
    Ok(())
}

/// Put every unfinished record back in the queue. Run once at startup: any
/// record left `downloading`, `downloaded` or `failed` by an earlier process
/// gets another full attempt. Returns the number of records reset.
pub fn reset_stalled_records(conn: &Connection) -> StoreResult<usize> {
    let n = conn.execute(
        "UPDATE records SET status = 'queued' WHERE status NOT IN ('synced', 'queued')",
        [],
    )?;
    Ok(n)
}

/// Number of non-synced records a sync pass would consider.
pub fn count_unsynced(
    conn: &Connection,
    file_extension: &str,
    record_type: &RecordTypeFilter,
    cutoff: &DateTime<Local>,
) -> StoreResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*)
         FROM records r
         JOIN meetings m ON m.uuid = r.meeting_id
         WHERE r.status != 'synced'
           AND r.file_extension = ?1
           AND (?2 IS NULL OR r.type = ?2)
           AND m.start_time >= ?3",
        params![file_extension, record_type.as_type(), format_time(cutoff)],
        |row| row.get(0),
    )?;
    Ok(n)
}

/// Per-status record counts for the extension and type filter, in
/// [`RecordStatus::ALL`] order. Statuses with no records report zero.
pub fn count_by_status(
    conn: &Connection,
    file_extension: &str,
    record_type: &RecordTypeFilter,
) -> StoreResult<Vec<(RecordStatus, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM records
         WHERE file_extension = ?1 AND (?2 IS NULL OR type = ?2)
         GROUP BY status",
    )?;
    let rows = stmt
        .query_map(params![file_extension, record_type.as_type()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts: Vec<(RecordStatus, i64)> = RecordStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for (status, n) in rows {
        let status = status
            .parse::<RecordStatus>()
            .map_err(|e| StoreError::InvalidValue {
                column: "records.status",
                message: e.to_string(),
            })?;
        if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == status) {
            slot.1 = n;
        }
    }
    Ok(counts)
}
