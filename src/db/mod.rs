//! Record store: durable SQLite tables of meetings and their recording files.
//!
//! All resume and dedup decisions read and write here. Functions take a
//! `&Connection` so commands decide the database location and lifetime.

pub mod connection;
pub mod info;
pub mod meetings;
pub mod migrations;
pub mod records;
pub mod schema;
#[cfg(test)]
pub mod test_fixtures;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid value in column '{column}': {message}")]
    InvalidValue { column: &'static str, message: String },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Stored timestamps are local wall-clock time, second precision. This format
/// sorts lexicographically in chronological order.
pub(crate) const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_time(t: &DateTime<Local>) -> String {
    t.format(TIME_FORMAT).to_string()
}

pub(crate) fn parse_time(column: &'static str, s: &str) -> StoreResult<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s, TIME_FORMAT).map_err(|e| {
        StoreError::InvalidValue {
            column,
            message: format!("'{}': {}", s, e),
        }
    })?;
    // A wall-clock time inside a DST gap has no mapping; take the earliest
    // instant for ambiguous times.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| StoreError::InvalidValue {
            column,
            message: format!("'{}' does not exist in the local time zone", s),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_roundtrip_is_second_precision() {
        let t = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let s = format_time(&t);
        assert_eq!(s, "2024-03-09 14:05:07");
        assert_eq!(parse_time("start_time", &s).unwrap(), t);
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        let err = parse_time("start_time", "yesterday").unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { column: "start_time", .. }));
    }
}
