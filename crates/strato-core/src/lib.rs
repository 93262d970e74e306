//! Strato Core Library
//!
//! Shared domain models and configuration for the strato ingestion
//! pipeline: the tracked [`FileUnit`], its durable [`FileRecord`]
//! projection, and the environment-driven [`Config`].

pub mod config;
pub mod models;

// Re-export commonly used types
pub use config::{Config, StoreBackend};
pub use models::{
    format_size, FileKind, FileRecord, FileUnit, NewFileRecord, StagedFile, UnitState,
};
