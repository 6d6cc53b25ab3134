//! Meeting persistence: insert-if-absent ingestion and point lookups.

use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::records::{RECORD_COLUMNS, RecordRow, row_to_record};
use super::{StoreError, StoreResult, format_time, parse_time};
use crate::models::{Meeting, Record};

/// Counts from an ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertStats {
    pub meetings_inserted: usize,
    pub meetings_existing: usize,
    pub records_inserted: usize,
    pub records_existing: usize,
}

impl UpsertStats {
    fn add(&mut self, other: UpsertStats) {
        self.meetings_inserted += other.meetings_inserted;
        self.meetings_existing += other.meetings_existing;
        self.records_inserted += other.records_inserted;
        self.records_existing += other.records_existing;
    }
}

/// Insert the meeting if its uuid is unknown, then insert each of its records
/// that is not already stored. Existing rows are never modified, so a record's
/// status survives re-ingestion. New records start `queued`.
pub fn upsert_meeting(conn: &Connection, meeting: &Meeting) -> StoreResult<UpsertStats> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = UpsertStats::default();

    let inserted = tx.execute(
        "INSERT INTO meetings (uuid, id, topic, start_time) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(uuid) DO NOTHING",
        params![
            &meeting.uuid,
            meeting.id as i64,
            &meeting.topic,
            format_time(&meeting.start_time),
        ],
    )?;
    if inserted > 0 {
        stats.meetings_inserted += 1;
    } else {
        stats.meetings_existing += 1;
    }

    {
        let mut insert_record = tx.prepare(
            "INSERT INTO records (id, meeting_id, type, start_time, file_extension, file_size, download_url, play_url, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'queued')
             ON CONFLICT(id) DO NOTHING",
        )?;
        for record in &meeting.records {
            let n = insert_record.execute(params![
                &record.id,
                &meeting.uuid,
                record.record_type.as_str(),
                format_time(&record.start_time),
                &record.file_extension,
                record.file_size.0 as i64,
                &record.download_url,
                &record.play_url,
            ])?;
            if n > 0 {
                stats.records_inserted += 1;
            } else {
                stats.records_existing += 1;
            }
        }
    }

    tx.commit()?;
    debug!(
        "Upserted meeting {} ({} new record(s))",
        meeting.uuid, stats.records_inserted
    );
    Ok(stats)
}

/// Upsert every meeting, summing the per-meeting counts.
pub fn upsert_meetings(conn: &Connection, meetings: &[Meeting]) -> StoreResult<UpsertStats> {
    let mut total = UpsertStats::default();
    for meeting in meetings {
        total.add(upsert_meeting(conn, meeting)?);
    }
    Ok(total)
}

pub(crate) struct MeetingRow {
    pub uuid: String,
    pub id: i64,
    pub topic: String,
    pub start_time: String,
}

pub(crate) fn row_to_meeting(row: MeetingRow, records: Vec<Record>) -> StoreResult<Meeting> {
    Ok(Meeting {
        uuid: row.uuid,
        id: row.id as u64,
        topic: row.topic,
        start_time: parse_time("meetings.start_time", &row.start_time)?,
        records,
    })
}

pub(crate) fn read_meeting_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingRow> {
    Ok(MeetingRow {
        uuid: row.get(0)?,
        id: row.get(1)?,
        topic: row.get(2)?,
        start_time: row.get(3)?,
    })
}

/// Look up a meeting with all of its records.
pub fn get_meeting(conn: &Connection, uuid: &str) -> StoreResult<Meeting> {
    let row = conn
        .query_row(
            "SELECT uuid, id, topic, start_time FROM meetings WHERE uuid = ?1",
            [uuid],
            read_meeting_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            kind: "Meeting",
            id: uuid.to_string(),
        })?;

    let records = get_records(conn, uuid)?;
    row_to_meeting(row, records)
}

/// All records of a meeting in insertion order. Empty for an unknown uuid.
pub fn get_records(conn: &Connection, meeting_uuid: &str) -> StoreResult<Vec<Record>> {
    let sql = format!(
        "SELECT {} FROM records WHERE meeting_id = ?1 ORDER BY rowid",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([meeting_uuid], RecordRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(row_to_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::test_db;
    use crate::db::test_fixtures::{at, meeting, record, standup};
    use crate::models::{RecordStatus, RecordType};

    #[test]
    fn test_upsert_inserts_meeting_and_records() {
        let conn = test_db();
        let m = standup("uuid-1", at(3, 10));

        let stats = upsert_meeting(&conn, &m).unwrap();
        assert_eq!(stats.meetings_inserted, 1);
        assert_eq!(stats.records_inserted, 2);

        let stored = get_meeting(&conn, "uuid-1").unwrap();
        assert_eq!(stored.topic, "Daily Standup");
        assert_eq!(stored.id, 81234567890);
        assert_eq!(stored.start_time, at(3, 10));
        assert_eq!(stored.records.len(), 2);
        assert!(stored.records.iter().all(|r| r.status == RecordStatus::Queued));
        assert!(stored.records.iter().all(|r| r.meeting_id == "uuid-1"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let conn = test_db();
        let m = standup("uuid-1", at(3, 10));

        upsert_meeting(&conn, &m).unwrap();
        let stats = upsert_meeting(&conn, &m).unwrap();
        assert_eq!(stats.meetings_inserted, 0);
        assert_eq!(stats.meetings_existing, 1);
        assert_eq!(stats.records_inserted, 0);
        assert_eq!(stats.records_existing, 2);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_upsert_preserves_existing_status() {
        let conn = test_db();
        let m = standup("uuid-1", at(3, 10));
        upsert_meeting(&conn, &m).unwrap();

        crate::db::records::set_record_status(&conn, "uuid-1-chat", RecordStatus::Synced).unwrap();
        upsert_meeting(&conn, &m).unwrap();

        let stored = get_meeting(&conn, "uuid-1").unwrap();
        assert_eq!(stored.records[0].status, RecordStatus::Synced);
    }

    #[test]
    fn test_upsert_adds_new_records_to_existing_meeting() {
        let conn = test_db();
        let mut m = standup("uuid-1", at(3, 10));
        upsert_meeting(&conn, &m).unwrap();

        m.records.push(record("uuid-1-poll", "uuid-1", RecordType::Poll, "CSV"));
        let stats = upsert_meeting(&conn, &m).unwrap();
        assert_eq!(stats.meetings_existing, 1);
        assert_eq!(stats.records_inserted, 1);
        assert_eq!(get_records(&conn, "uuid-1").unwrap().len(), 3);
    }

    #[test]
    fn test_get_records_insertion_order() {
        let conn = test_db();
        let m = meeting(
            "uuid-1",
            1,
            "Ordering",
            at(3, 10),
            vec![
                record("z-last-alphabetically", "uuid-1", RecordType::ChatFile, "TXT"),
                record("a-first-alphabetically", "uuid-1", RecordType::ChatFile, "TXT"),
            ],
        );
        upsert_meeting(&conn, &m).unwrap();

        let ids: Vec<String> = get_records(&conn, "uuid-1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["z-last-alphabetically", "a-first-alphabetically"]);
    }

    #[test]
    fn test_get_meeting_not_found() {
        let conn = test_db();
        let err = get_meeting(&conn, "missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "Meeting", .. }));
    }

    #[test]
    fn test_upsert_meetings_sums_stats() {
        let conn = test_db();
        let meetings = vec![standup("a", at(1, 10)), standup("b", at(2, 10))];

        let stats = upsert_meetings(&conn, &meetings).unwrap();
        assert_eq!(stats.meetings_inserted, 2);
        assert_eq!(stats.records_inserted, 4);
    }
}
