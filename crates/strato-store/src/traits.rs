//! Metadata store abstraction
//!
//! This module defines the contract for the durable per-owner file records
//! that back the in-memory registry across restarts.

use async_trait::async_trait;
use strato_core::{FileRecord, NewFileRecord};
use thiserror::Error;
use uuid::Uuid;

/// Metadata store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(Uuid),

    #[error("record rejected: {0}")]
    ValidationRejected(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata store abstraction trait
///
/// Implementations persist one row per completed upload, scoped by owner.
/// Deleting an absent record reports [`StoreError::NotFound`] rather than
/// succeeding silently; callers that only care about the end state can
/// demote it, since "record absent" already holds.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// All records for `owner`, newest first by creation timestamp.
    async fn list_records(&self, owner: Uuid) -> StoreResult<Vec<FileRecord>>;

    /// Persist one record; the store assigns the id and creation timestamp.
    async fn create_record(&self, record: NewFileRecord) -> StoreResult<FileRecord>;

    /// Remove one record by id.
    async fn delete_record(&self, id: Uuid) -> StoreResult<()>;
}
