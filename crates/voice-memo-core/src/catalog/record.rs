use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Metadata for one finished recording.
///
/// The file reference is a bare file name inside the storage directory, never
/// a path, so the catalog survives the directory moving. Timestamps are held
/// at microsecond precision, which is exactly what the persisted epoch-seconds
/// float can carry.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingRecord {
    id: Uuid,
    file_name: String,
    created_at: DateTime<Utc>,
    duration_seconds: f64,
}

impl RecordingRecord {
    /// Build a record. Directory components in `file_name` are stripped and a
    /// negative or non-finite duration is stored as zero.
    pub fn new(
        id: Uuid,
        file_name: impl Into<String>,
        created_at: DateTime<Utc>,
        duration_seconds: f64,
    ) -> Self {
        let file_name = file_name.into();
        let file_name = base_name(&file_name).unwrap_or(file_name);

        let created_at =
            DateTime::from_timestamp_micros(created_at.timestamp_micros()).unwrap_or(created_at);

        let duration_seconds = if duration_seconds.is_finite() && duration_seconds > 0.0 {
            duration_seconds
        } else {
            0.0
        };

        Self {
            id,
            file_name,
            created_at,
            duration_seconds,
        }
    }

    /// Unique identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// File name inside the storage directory.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// When the recording was finalized.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Length as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds)
    }

    /// Name shown to the user: the file name without its extension.
    pub fn display_name(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }

    /// Duration as `m:ss`.
    pub fn formatted_duration(&self) -> String {
        let total = self.duration_seconds.round() as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }

    /// Case-insensitive substring match on the display name. An empty query
    /// matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty()
            || self
                .display_name()
                .to_lowercase()
                .contains(&query.to_lowercase())
    }

    /// Absolute path of the backing file under `storage_dir`.
    pub fn path_in(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.file_name)
    }

    /// Size of the backing file in bytes, if it exists.
    pub fn file_size(&self, storage_dir: &Path) -> Option<u64> {
        fs::metadata(self.path_in(storage_dir)).ok().map(|m| m.len())
    }

    pub(crate) fn to_persisted(&self) -> PersistedRecord {
        PersistedRecord {
            id: self.id.to_string(),
            filename: self.file_name.clone(),
            created_at: self.created_at.timestamp_micros() as f64 / MICROS_PER_SECOND,
            duration_seconds: self.duration_seconds,
        }
    }

    /// Validate a persisted entry. `None` if any field is unusable.
    pub(crate) fn from_persisted(entry: PersistedRecord) -> Option<Self> {
        let id = Uuid::parse_str(&entry.id).ok()?;
        let file_name = base_name(&entry.filename)?;

        if !entry.created_at.is_finite() {
            return None;
        }
        let micros = (entry.created_at * MICROS_PER_SECOND).round();
        if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
            return None;
        }
        let created_at = DateTime::from_timestamp_micros(micros as i64)?;

        if !entry.duration_seconds.is_finite() || entry.duration_seconds < 0.0 {
            return None;
        }

        Some(Self {
            id,
            file_name,
            created_at,
            duration_seconds: entry.duration_seconds,
        })
    }
}

/// On-disk shape of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PersistedRecord {
    pub(crate) id: String,
    pub(crate) filename: String,
    #[serde(rename = "createdAt")]
    pub(crate) created_at: f64,
    #[serde(rename = "durationSeconds")]
    pub(crate) duration_seconds: f64,
}

/// Final path component as an owned string, if it is a usable file name.
fn base_name(reference: &str) -> Option<String> {
    Path::new(reference)
        .file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
