use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::FileRecord;

/// Lifecycle state of a tracked file unit.
///
/// `Staged` is entered at batch intake, before any network call.
/// `Uploading` is entered immediately before the transfer starts.
/// `Completed` and `Failed` are terminal; a failed unit only re-enters
/// `Uploading` through an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Staged,
    Uploading,
    Completed,
    Failed,
}

impl UnitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::Staged => "staged",
            UnitState::Uploading => "uploading",
            UnitState::Completed => "completed",
            UnitState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitState::Completed | UnitState::Failed)
    }
}

/// Coarse display grouping derived from the mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Other,
}

impl FileKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            FileKind::Image
        } else if mime_type.starts_with("video/") {
            FileKind::Video
        } else {
            FileKind::Other
        }
    }
}

/// A locally selected file handed to the engine at batch intake.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
    /// Local ephemeral preview resource, if the caller produced one.
    pub preview_reference: Option<String>,
}

/// One tracked file from intake to terminal state.
///
/// Units live only in the in-memory registry; a completed unit's durable
/// projection is a [`FileRecord`]. The unit itself is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUnit {
    pub id: Uuid,
    pub name: String,
    pub byte_size: i64,
    pub mime_type: String,
    /// Display-only locator. Before upload this is the caller's local
    /// preview resource (images only); after upload it is the remote
    /// locator for every kind.
    pub preview_reference: Option<String>,
    pub remote_locator: Option<String>,
    pub remote_public_id: Option<String>,
    /// Metadata store row backing this unit, once the persistence write
    /// has succeeded.
    pub record_id: Option<Uuid>,
    /// 0-100, non-decreasing while uploading. Meaningless once terminal.
    pub progress_percent: u8,
    pub state: UnitState,
    pub failure_reason: Option<String>,
}

impl FileUnit {
    /// New unit in `Staged` with a fresh client-generated identifier.
    pub fn staged(file: &StagedFile) -> Self {
        let preview_reference = match FileKind::from_mime(&file.mime_type) {
            FileKind::Image => file.preview_reference.clone(),
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            name: file.name.clone(),
            byte_size: file.bytes.len() as i64,
            mime_type: file.mime_type.clone(),
            preview_reference,
            remote_locator: None,
            remote_public_id: None,
            record_id: None,
            progress_percent: 0,
            state: UnitState::Staged,
            failure_reason: None,
        }
    }

    /// Project a durable record back into a completed unit. Used by
    /// startup reconciliation; the remote locator doubles as the preview.
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.file_name.clone(),
            byte_size: record.byte_size,
            mime_type: record.mime_type.clone(),
            preview_reference: Some(record.remote_locator.clone()),
            remote_locator: Some(record.remote_locator.clone()),
            remote_public_id: None,
            record_id: Some(record.id),
            progress_percent: 100,
            state: UnitState::Completed,
            failure_reason: None,
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.mime_type)
    }
}

/// Human-readable byte size with a 1024 divisor and one decimal place,
/// trailing `.0` trimmed ("10 B", "1.5 KB", "2 MB").
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes <= 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as i64, UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, UNITS[unit])
    }
}
