//! Domain types for recsync.
//!
//! `Meeting` and `Record` values are plain copies passed between the filter
//! pipeline, the record store and the transfer orchestrator. The store owns the
//! persisted rows; nothing here is shared mutable state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Record Status
// ============================================================================

/// Transfer progress of a single recording file.
///
/// `Synced` is the only terminal state. `Failed` is retryable: the next run's
/// stall reset puts it back to `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Queued,
    Downloading,
    Downloaded,
    Failed,
    Synced,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 5] = [
        RecordStatus::Queued,
        RecordStatus::Downloading,
        RecordStatus::Downloaded,
        RecordStatus::Failed,
        RecordStatus::Synced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Queued => "queued",
            RecordStatus::Downloading => "downloading",
            RecordStatus::Downloaded => "downloaded",
            RecordStatus::Failed => "failed",
            RecordStatus::Synced => "synced",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown record status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for RecordStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(RecordStatus::Queued),
            "downloading" => Ok(RecordStatus::Downloading),
            "downloaded" => Ok(RecordStatus::Downloaded),
            "failed" => Ok(RecordStatus::Failed),
            "synced" => Ok(RecordStatus::Synced),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Record Type
// ============================================================================

/// Cloud recording category as reported by the recording service.
///
/// Categories this build does not know about are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    SharedScreenWithSpeakerViewCc,
    SharedScreenWithSpeakerView,
    SharedScreenWithGalleryView,
    ActiveSpeaker,
    GalleryView,
    SharedScreen,
    AudioOnly,
    AudioTranscript,
    ChatFile,
    ClosedCaption,
    Timeline,
    Poll,
    Summary,
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::SharedScreenWithSpeakerViewCc => "shared_screen_with_speaker_view(CC)",
            RecordType::SharedScreenWithSpeakerView => "shared_screen_with_speaker_view",
            RecordType::SharedScreenWithGalleryView => "shared_screen_with_gallery_view",
            RecordType::ActiveSpeaker => "active_speaker",
            RecordType::GalleryView => "gallery_view",
            RecordType::SharedScreen => "shared_screen",
            RecordType::AudioOnly => "audio_only",
            RecordType::AudioTranscript => "audio_transcript",
            RecordType::ChatFile => "chat_file",
            RecordType::ClosedCaption => "closed_caption",
            RecordType::Timeline => "timeline",
            RecordType::Poll => "poll",
            RecordType::Summary => "summary",
            RecordType::Other(s) => s,
        }
    }
}

impl From<&str> for RecordType {
    fn from(s: &str) -> Self {
        match s {
            "shared_screen_with_speaker_view(CC)" => RecordType::SharedScreenWithSpeakerViewCc,
            "shared_screen_with_speaker_view" => RecordType::SharedScreenWithSpeakerView,
            "shared_screen_with_gallery_view" => RecordType::SharedScreenWithGalleryView,
            "active_speaker" => RecordType::ActiveSpeaker,
            "gallery_view" => RecordType::GalleryView,
            "shared_screen" => RecordType::SharedScreen,
            "audio_only" => RecordType::AudioOnly,
            "audio_transcript" => RecordType::AudioTranscript,
            "chat_file" => RecordType::ChatFile,
            "closed_caption" => RecordType::ClosedCaption,
            "timeline" => RecordType::Timeline,
            "poll" => RecordType::Poll,
            "summary" => RecordType::Summary,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl From<String> for RecordType {
    fn from(s: String) -> Self {
        RecordType::from(s.as_str())
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which recording categories a run cares about. `"all"` is the wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordTypeFilter {
    All,
    Only(RecordType),
}

impl RecordTypeFilter {
    pub fn matches(&self, record_type: &RecordType) -> bool {
        match self {
            RecordTypeFilter::All => true,
            RecordTypeFilter::Only(t) => t == record_type,
        }
    }

    /// The concrete type to match in SQL, or `None` for the wildcard.
    pub fn as_type(&self) -> Option<&str> {
        match self {
            RecordTypeFilter::All => None,
            RecordTypeFilter::Only(t) => Some(t.as_str()),
        }
    }
}

impl FromStr for RecordTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("record type must not be empty (use 'all' for every type)".to_string()),
            "all" => Ok(RecordTypeFilter::All),
            t => Ok(RecordTypeFilter::Only(RecordType::from(t))),
        }
    }
}

impl fmt::Display for RecordTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordTypeFilter::All => f.write_str("all"),
            RecordTypeFilter::Only(t) => f.write_str(t.as_str()),
        }
    }
}

// ============================================================================
// File Size
// ============================================================================

/// Size of a recording file in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSize(pub u64);

impl fmt::Display for FileSize {
    /// Human readable, binary units: `512B`, `1.5kB`, `3.2MB`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNIT: u64 = 1024;
        if self.0 < UNIT {
            return write!(f, "{}B", self.0);
        }
        let mut div = UNIT;
        let mut exp = 0;
        let mut n = self.0 / UNIT;
        while n >= UNIT {
            div *= UNIT;
            exp += 1;
            n /= UNIT;
        }
        let suffix = ['k', 'M', 'G', 'T', 'P', 'E'][exp];
        write!(f, "{:.1}{}B", self.0 as f64 / div as f64, suffix)
    }
}

// ============================================================================
// Meeting / Record
// ============================================================================

/// A recorded meeting instance and its recording files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meeting {
    /// Globally unique instance id (primary key).
    pub uuid: String,
    /// Source meeting number; reused across recurring instances.
    pub id: u64,
    pub topic: String,
    pub start_time: DateTime<Local>,
    pub records: Vec<Record>,
}

impl Meeting {
    /// Copy of this meeting carrying a different record list.
    pub fn with_records(&self, records: Vec<Record>) -> Meeting {
        Meeting {
            uuid: self.uuid.clone(),
            id: self.id,
            topic: self.topic.clone(),
            start_time: self.start_time,
            records,
        }
    }
}

/// One recording artifact belonging to a meeting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub meeting_id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub start_time: DateTime<Local>,
    pub file_extension: String,
    pub file_size: FileSize,
    pub download_url: String,
    pub play_url: String,
    pub status: RecordStatus,
    pub file_path: Option<String>,
}
