//! Configuration module
//!
//! Environment-driven settings for the transfer channel and the metadata
//! store backends. Transfer settings are allowed to be empty: a missing
//! upload endpoint or destination hint surfaces per-unit at upload time,
//! not as a startup failure.

use std::env;
use std::time::Duration;

/// Selected metadata store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Rest,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Rest => "rest",
        }
    }
}

/// Runtime configuration, sourced from `STRATO_*` environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub store_url: Option<String>,
    pub store_api_key: Option<String>,
    /// Base endpoint of the object-storage service. May be empty.
    pub transfer_url: String,
    /// Destination hint (upload preset) passed to the transfer channel.
    /// May be empty.
    pub transfer_preset: String,
    pub upload_timeout_secs: u64,
    pub max_file_size_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const UPLOAD_TIMEOUT_SECS: u64 = 300;
        const MAX_FILE_SIZE_MB: usize = 10;

        let store_backend = env::var("STRATO_STORE_BACKEND")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "postgres" => Some(StoreBackend::Postgres),
                "rest" => Some(StoreBackend::Rest),
                _ => None,
            })
            .unwrap_or(StoreBackend::Rest);

        let max_file_size_mb = env::var("STRATO_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let config = Config {
            store_backend,
            database_url: env::var("STRATO_DATABASE_URL").ok(),
            store_url: env::var("STRATO_STORE_URL").ok(),
            store_api_key: env::var("STRATO_STORE_API_KEY").ok(),
            transfer_url: env::var("STRATO_TRANSFER_URL").unwrap_or_default(),
            transfer_preset: env::var("STRATO_TRANSFER_PRESET").unwrap_or_default(),
            upload_timeout_secs: env::var("STRATO_UPLOAD_TIMEOUT_SECS")
                .unwrap_or_else(|_| UPLOAD_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_TIMEOUT_SECS),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.store_backend {
            StoreBackend::Postgres => {
                let url = self.database_url.as_deref().unwrap_or_default();
                if url.is_empty() {
                    return Err(anyhow::anyhow!(
                        "STRATO_DATABASE_URL must be set when using the postgres store backend"
                    ));
                }
                if !url.starts_with("postgres") {
                    return Err(anyhow::anyhow!(
                        "STRATO_DATABASE_URL must be a valid PostgreSQL connection string"
                    ));
                }
            }
            StoreBackend::Rest => {
                if self.store_url.as_deref().unwrap_or_default().is_empty() {
                    return Err(anyhow::anyhow!(
                        "STRATO_STORE_URL must be set when using the rest store backend"
                    ));
                }
                if self.store_api_key.as_deref().unwrap_or_default().is_empty() {
                    return Err(anyhow::anyhow!(
                        "STRATO_STORE_API_KEY must be set when using the rest store backend"
                    ));
                }
            }
        }

        if self.upload_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "STRATO_UPLOAD_TIMEOUT_SECS must be greater than zero"
            ));
        }

        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}
