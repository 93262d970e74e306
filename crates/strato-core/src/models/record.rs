use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Durable metadata row for a completed upload.
///
/// Rows are scoped by `owner_id`; listings are ordered newest first by
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct FileRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub remote_locator: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a [`FileRecord`]; the store assigns the id and the
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFileRecord {
    pub owner_id: Uuid,
    pub file_name: String,
    pub remote_locator: String,
    pub mime_type: String,
    pub byte_size: i64,
}
