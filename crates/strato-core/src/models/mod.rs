//! Data models for the ingestion pipeline.
//!
//! [`FileUnit`] is the in-memory tracked representation; [`FileRecord`] is
//! its durable projection in the metadata store. The engine is the only
//! component that translates between the two.

mod record;
mod unit;

pub use record::{FileRecord, NewFileRecord};
pub use unit::{format_size, FileKind, FileUnit, StagedFile, UnitState};
