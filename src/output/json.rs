use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Meeting, RecordStatus};
use crate::naming::{meeting_folder_name, record_file_name};

/// Serialize any serializable value to pretty JSON string.
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// A meeting with records still to sync, as listed by `status --json`.
#[derive(Debug, Serialize)]
pub struct CandidateJson {
    pub uuid: String,
    pub id: u64,
    pub topic: String,
    pub start_time: String,
    pub folder: String,
    pub records: Vec<RecordJson>,
}

#[derive(Debug, Serialize)]
pub struct RecordJson {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub file_name: String,
    pub file_size: u64,
    pub status: RecordStatus,
}

impl CandidateJson {
    pub fn from_meeting(meeting: &Meeting) -> Self {
        CandidateJson {
            uuid: meeting.uuid.clone(),
            id: meeting.id,
            topic: meeting.topic.clone(),
            start_time: meeting.start_time.to_rfc3339(),
            folder: meeting_folder_name(meeting),
            records: meeting
                .records
                .iter()
                .map(|r| RecordJson {
                    id: r.id.clone(),
                    record_type: r.record_type.to_string(),
                    file_name: record_file_name(r),
                    file_size: r.file_size.0,
                    status: r.status,
                })
                .collect(),
        }
    }
}

/// Output of `status --json`.
#[derive(Debug, Serialize)]
pub struct StatusJson {
    pub file_type: String,
    pub record_type: String,
    pub cutoff: String,
    pub unsynced: i64,
    pub by_status: BTreeMap<String, i64>,
    pub candidates: Vec<CandidateJson>,
}

pub fn status_counts_map(counts: &[(RecordStatus, i64)]) -> BTreeMap<String, i64> {
    counts.iter().map(|(s, n)| (s.to_string(), *n)).collect()
}
