#[cfg(feature = "store-postgres")]
use crate::PgMetadataStore;
#[cfg(feature = "store-rest")]
use crate::RestMetadataStore;
use crate::{MetadataStore, StoreError, StoreResult};
use std::sync::Arc;
use strato_core::{Config, StoreBackend};

/// Create a metadata store backend based on configuration
pub async fn create_metadata_store(config: &Config) -> StoreResult<Arc<dyn MetadataStore>> {
    match config.store_backend {
        #[cfg(feature = "store-postgres")]
        StoreBackend::Postgres => {
            let database_url = config.database_url.clone().ok_or_else(|| {
                StoreError::Configuration("STRATO_DATABASE_URL not configured".to_string())
            })?;

            let store = PgMetadataStore::new(&database_url).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "store-postgres"))]
        StoreBackend::Postgres => Err(StoreError::Configuration(
            "postgres store backend not available (store-postgres feature not enabled)".to_string(),
        )),

        #[cfg(feature = "store-rest")]
        StoreBackend::Rest => {
            let store_url = config.store_url.clone().ok_or_else(|| {
                StoreError::Configuration("STRATO_STORE_URL not configured".to_string())
            })?;
            let api_key = config.store_api_key.clone().ok_or_else(|| {
                StoreError::Configuration("STRATO_STORE_API_KEY not configured".to_string())
            })?;

            let store = RestMetadataStore::new(store_url, api_key)?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "store-rest"))]
        StoreBackend::Rest => Err(StoreError::Configuration(
            "rest store backend not available (store-rest feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "store-rest"))]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            store_backend: StoreBackend::Rest,
            database_url: None,
            store_url: Some("https://store.example".to_string()),
            store_api_key: Some("key".to_string()),
            transfer_url: String::new(),
            transfer_preset: String::new(),
            upload_timeout_secs: 300,
            max_file_size_bytes: 10 * 1024 * 1024,
        }
    }

    #[tokio::test]
    async fn missing_rest_settings_are_configuration_errors() {
        let mut incomplete = config();
        incomplete.store_url = None;

        let result = create_metadata_store(&incomplete).await;
        assert!(matches!(result, Err(StoreError::Configuration(_))));
    }

    #[tokio::test]
    async fn rest_backend_is_constructed() {
        let store = create_metadata_store(&config()).await;
        assert!(store.is_ok());
    }
}
