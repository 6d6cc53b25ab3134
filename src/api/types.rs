//! Wire types for the recording service's list-recordings endpoint.
//!
//! Only the fields the sync pipeline reads are modelled; everything else in
//! the payload is ignored.

use chrono::{DateTime, Local, Timelike, Utc};
use serde::Deserialize;

use crate::models::{FileSize, Meeting, Record, RecordStatus, RecordType};

/// One page of `GET /users/{id}/recordings`.
#[derive(Debug, Deserialize)]
pub struct RecordingsPage {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_records: Option<u64>,
    /// Empty (or absent) on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub meetings: Vec<ApiMeeting>,
}

impl RecordingsPage {
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiMeeting {
    pub uuid: String,
    pub id: u64,
    #[serde(default)]
    pub topic: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub recording_files: Vec<ApiRecordingFile>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRecordingFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub recording_type: String,
    #[serde(default)]
    pub recording_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_extension: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub play_url: String,
}

fn to_local_seconds(t: DateTime<Utc>) -> DateTime<Local> {
    let local = t.with_timezone(&Local);
    local.with_nanosecond(0).unwrap_or(local)
}

impl ApiMeeting {
    /// Convert to the domain model. Files without an id or download link
    /// cannot be tracked and are dropped.
    pub fn into_meeting(self) -> Meeting {
        let start_time = to_local_seconds(self.start_time);
        let uuid = self.uuid;

        let records = self
            .recording_files
            .into_iter()
            .filter(|f| {
                let usable = !f.id.is_empty() && !f.download_url.is_empty();
                if !usable {
                    log::debug!("Skipping recording file without id/url in meeting {}", uuid);
                }
                usable
            })
            .map(|f| Record {
                id: f.id,
                meeting_id: uuid.clone(),
                record_type: RecordType::from(f.recording_type),
                start_time: f.recording_start.map(to_local_seconds).unwrap_or(start_time),
                file_extension: f.file_extension,
                file_size: FileSize(f.file_size),
                download_url: f.download_url,
                play_url: f.play_url,
                status: RecordStatus::Queued,
                file_path: None,
            })
            .collect();

        Meeting {
            uuid,
            id: self.id,
            topic: self.topic,
            start_time,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "from": "2024-04-05",
        "to": "2024-05-05",
        "page_count": 1,
        "page_size": 300,
        "total_records": 1,
        "next_page_token": "",
        "meetings": [{
            "uuid": "4444AAAiAAAAAiAiAiiAii==",
            "id": 81234567890,
            "account_id": "acc",
            "host_id": "host",
            "topic": "Daily Standup",
            "type": 8,
            "start_time": "2024-05-03T09:00:00Z",
            "duration": 15,
            "total_size": 4096,
            "recording_count": 3,
            "recording_files": [
                {
                    "id": "rec-chat",
                    "meeting_id": "4444AAAiAAAAAiAiAiiAii==",
                    "recording_start": "2024-05-03T09:00:05Z",
                    "recording_end": "2024-05-03T09:15:00Z",
                    "file_type": "CHAT",
                    "file_extension": "TXT",
                    "file_size": 1024,
                    "play_url": "https://example.zoom.us/rec/play/chat",
                    "download_url": "https://example.zoom.us/rec/download/chat",
                    "status": "completed",
                    "recording_type": "chat_file"
                },
                {
                    "id": "rec-video",
                    "recording_start": "2024-05-03T09:00:05Z",
                    "file_extension": "MP4",
                    "file_size": 3072,
                    "download_url": "https://example.zoom.us/rec/download/video",
                    "recording_type": "shared_screen_with_speaker_view(CC)"
                },
                {
                    "meeting_id": "4444AAAiAAAAAiAiAiiAii==",
                    "file_type": "TIMELINE",
                    "download_url": "https://example.zoom.us/rec/download/timeline"
                }
            ]
        }]
    }"#;

    #[test]
    fn test_page_parses_and_ignores_unknown_fields() {
        let page: RecordingsPage = serde_json::from_str(PAGE).unwrap();
        assert_eq!(page.meetings.len(), 1);
        assert_eq!(page.page_size, Some(300));
        assert!(page.next_page().is_none());
    }

    #[test]
    fn test_into_meeting() {
        let page: RecordingsPage = serde_json::from_str(PAGE).unwrap();
        let meeting = page.meetings.into_iter().next().unwrap().into_meeting();

        assert_eq!(meeting.id, 81234567890);
        assert_eq!(meeting.topic, "Daily Standup");
        assert_eq!(
            meeting.start_time,
            "2024-05-03T09:00:00Z".parse::<DateTime<Utc>>().unwrap().with_timezone(&Local)
        );

        // The timeline entry has no id and is dropped.
        assert_eq!(meeting.records.len(), 2);
        let chat = &meeting.records[0];
        assert_eq!(chat.record_type, RecordType::ChatFile);
        assert_eq!(chat.file_extension, "TXT");
        assert_eq!(chat.file_size, FileSize(1024));
        assert_eq!(chat.meeting_id, meeting.uuid);
        assert_eq!(chat.status, RecordStatus::Queued);

        let video = &meeting.records[1];
        assert_eq!(video.record_type, RecordType::SharedScreenWithSpeakerViewCc);
        assert!(video.play_url.is_empty());
    }

    #[test]
    fn test_next_page_token() {
        let page: RecordingsPage =
            serde_json::from_str(r#"{"next_page_token":"abc","meetings":[]}"#).unwrap();
        assert_eq!(page.next_page(), Some("abc"));

        let page: RecordingsPage = serde_json::from_str(r#"{"meetings":[]}"#).unwrap();
        assert!(page.next_page().is_none());
    }
}
