//! Strato Store Library
//!
//! Metadata store abstraction and backends. The store keeps one durable
//! record per completed upload; the engine lists them at startup to seed
//! the registry and writes/deletes them as uploads finish and units are
//! removed.

pub mod factory;
#[cfg(feature = "store-postgres")]
pub mod postgres;
#[cfg(feature = "store-rest")]
pub mod rest;
pub mod traits;

// Re-export commonly used types
pub use factory::create_metadata_store;
#[cfg(feature = "store-postgres")]
pub use postgres::PgMetadataStore;
#[cfg(feature = "store-rest")]
pub use rest::RestMetadataStore;
pub use strato_core::StoreBackend;
pub use traits::{MetadataStore, StoreError, StoreResult};
