//! PostgreSQL metadata store
//!
//! Runtime-checked queries against a `file_records` table whose schema the
//! store bootstraps itself on startup.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use strato_core::{FileRecord, NewFileRecord};
use uuid::Uuid;

use crate::traits::{MetadataStore, StoreError, StoreResult};

const MAX_CONNECTIONS: u32 = 5;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS file_records (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    file_name TEXT NOT NULL,
    remote_locator TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    byte_size BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)
"#;

const CREATE_OWNER_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_file_records_owner_created \
     ON file_records (owner_id, created_at DESC)";

pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bootstrap the schema.
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(store_error)?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    pub async fn init(&self) -> StoreResult<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        sqlx::query(CREATE_OWNER_INDEX)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        tracing::debug!("file_records schema ensured");
        Ok(())
    }
}

fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.constraint().is_some() => {
            StoreError::ValidationRejected(err.to_string())
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn list_records(&self, owner: Uuid) -> StoreResult<Vec<FileRecord>> {
        let rows: Vec<FileRecord> = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            SELECT id, owner_id, file_name, remote_locator, mime_type, byte_size, created_at
            FROM file_records
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows)
    }

    async fn create_record(&self, record: NewFileRecord) -> StoreResult<FileRecord> {
        let row: FileRecord = sqlx::query_as::<Postgres, FileRecord>(
            r#"
            INSERT INTO file_records (
                id, owner_id, file_name, remote_locator, mime_type, byte_size, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.owner_id)
        .bind(&record.file_name)
        .bind(&record.remote_locator)
        .bind(&record.mime_type)
        .bind(record.byte_size)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row)
    }

    async fn delete_record(&self, id: Uuid) -> StoreResult<()> {
        let rows_affected = sqlx::query("DELETE FROM file_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?
            .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
