use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::schema::get_schema_version;

#[derive(Debug, Serialize)]
pub struct DbInfo {
    pub total_meetings: i64,
    pub total_records: i64,
    pub synced_records: i64,
    pub unsynced_records: i64,
    pub earliest_meeting: Option<String>,
    pub latest_meeting: Option<String>,

    pub db_path: PathBuf,
    pub db_size_bytes: u64,
    pub schema_version: usize,
}

pub fn get_info(conn: &Connection, db_path: &Path) -> Result<DbInfo> {
    let total_meetings: i64 = conn.query_row("SELECT COUNT(*) FROM meetings", [], |row| row.get(0))?;

    let (total_records, synced_records): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(status = 'synced'), 0) FROM records",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let (earliest_meeting, latest_meeting): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(start_time), MAX(start_time) FROM meetings",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let db_size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    Ok(DbInfo {
        total_meetings,
        total_records,
        synced_records,
        unsynced_records: total_records - synced_records,
        earliest_meeting,
        latest_meeting,
        db_path: db_path.to_path_buf(),
        db_size_bytes,
        schema_version: get_schema_version(conn)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::meetings::upsert_meeting;
    use crate::db::records::set_record_status;
    use crate::db::schema::test_db;
    use crate::db::test_fixtures::{at, standup};
    use crate::models::RecordStatus;

    #[test]
    fn test_info_empty_db() {
        let conn = test_db();
        let info = get_info(&conn, Path::new("/nonexistent/recsync.db")).unwrap();
        assert_eq!(info.total_meetings, 0);
        assert_eq!(info.total_records, 0);
        assert_eq!(info.synced_records, 0);
        assert!(info.earliest_meeting.is_none());
        assert_eq!(info.db_size_bytes, 0);
    }

    #[test]
    fn test_info_counts() {
        let conn = test_db();
        upsert_meeting(&conn, &standup("a", at(5, 10))).unwrap();
        upsert_meeting(&conn, &standup("b", at(9, 16))).unwrap();
        set_record_status(&conn, "a-chat", RecordStatus::Synced).unwrap();

        let info = get_info(&conn, Path::new("/nonexistent/recsync.db")).unwrap();
        assert_eq!(info.total_meetings, 2);
        assert_eq!(info.total_records, 4);
        assert_eq!(info.synced_records, 1);
        assert_eq!(info.unsynced_records, 3);
        assert_eq!(info.earliest_meeting.as_deref(), Some("2024-05-05 10:00:00"));
        assert_eq!(info.latest_meeting.as_deref(), Some("2024-05-09 16:00:00"));
    }
}
