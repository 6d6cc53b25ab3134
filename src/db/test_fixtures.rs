//! Shared builders for meetings and records used across unit tests.

use chrono::{DateTime, Local, TimeZone};

use crate::models::{FileSize, Meeting, Record, RecordStatus, RecordType};

/// Local time on 2024-05-{day} at {hour}:00:00.
pub fn at(day: u32, hour: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

pub fn record(id: &str, meeting_uuid: &str, record_type: RecordType, ext: &str) -> Record {
    Record {
        id: id.to_string(),
        meeting_id: meeting_uuid.to_string(),
        record_type,
        start_time: at(1, 9),
        file_extension: ext.to_string(),
        file_size: FileSize(2048),
        download_url: format!("https://recordings.example.com/download/{}", id),
        play_url: format!("https://recordings.example.com/play/{}", id),
        status: RecordStatus::Queued,
        file_path: None,
    }
}

pub fn meeting(uuid: &str, id: u64, topic: &str, start: DateTime<Local>, records: Vec<Record>) -> Meeting {
    let records = records
        .into_iter()
        .map(|r| Record {
            meeting_id: uuid.to_string(),
            start_time: start,
            ..r
        })
        .collect();
    Meeting {
        uuid: uuid.to_string(),
        id,
        topic: topic.to_string(),
        start_time: start,
        records,
    }
}

/// A meeting with one chat transcript and one audio file.
pub fn standup(uuid: &str, start: DateTime<Local>) -> Meeting {
    meeting(
        uuid,
        81234567890,
        "Daily Standup",
        start,
        vec![
            record(&format!("{}-chat", uuid), uuid, RecordType::ChatFile, "TXT"),
            record(&format!("{}-audio", uuid), uuid, RecordType::AudioOnly, "M4A"),
        ],
    )
}
