use anyhow::Result;
use rusqlite::Connection;

use crate::db::records::reset_stalled_records;
use crate::output::format::OutputMode;

/// `recsync reset`: requeue everything that is not synced.
pub fn run(conn: &Connection, mode: OutputMode) -> Result<()> {
    let n = reset_stalled_records(conn)?;
    match mode {
        OutputMode::Json => println!("{}", serde_json::json!({ "action": "reset", "reset": n })),
        OutputMode::Tty => println!("Re-queued {} record(s)", n),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::meetings::upsert_meeting;
    use crate::db::records::{get_record, set_record_status};
    use crate::db::schema::test_db;
    use crate::db::test_fixtures::{at, standup};
    use crate::models::RecordStatus;

    #[test]
    fn test_reset_requeues_failed() {
        let conn = test_db();
        upsert_meeting(&conn, &standup("m1", at(3, 9))).unwrap();
        set_record_status(&conn, "m1-chat", RecordStatus::Failed).unwrap();

        run(&conn, OutputMode::Json).unwrap();
        assert_eq!(get_record(&conn, "m1-chat").unwrap().status, RecordStatus::Queued);
    }
}
