//! Strato Ingestion Engine
//!
//! Ties the transfer channel and the metadata store to an in-memory unit
//! registry: batches of staged files go in, concurrent uploads run against
//! the channel, completed uploads are persisted in the background, and the
//! registry notifies subscribers of every change.

pub mod engine;
pub mod events;
pub mod registry;
pub mod session;

pub use engine::IngestionEngine;
pub use events::{RegistryEvent, RegistryEvents};
pub use registry::{UnitPatch, UnitRegistry};
pub use session::{SessionProvider, StaticSession};
