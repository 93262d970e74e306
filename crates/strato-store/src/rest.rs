//! REST metadata store
//!
//! Talks to a PostgREST-compatible endpoint (`/rest/v1/file_records`) with
//! an `apikey` header plus bearer auth, the wire shape served by hosted
//! Postgres providers. Listing relies on the server-side
//! `order=created_at.desc` filter; mutations ask for the representation
//! back so outcomes can be checked.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use strato_core::{FileRecord, NewFileRecord};
use uuid::Uuid;

use crate::traits::{MetadataStore, StoreError, StoreResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct RestMetadataStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestMetadataStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn records_url(&self) -> String {
        format!("{}/rest/v1/file_records", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        return Err(StoreError::ValidationRejected(body));
    }
    Err(StoreError::Unavailable(format!(
        "status {}: {}",
        status.as_u16(),
        body
    )))
}

fn unavailable(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl MetadataStore for RestMetadataStore {
    async fn list_records(&self, owner: Uuid) -> StoreResult<Vec<FileRecord>> {
        let url = format!(
            "{}?owner_id=eq.{}&select=*&order=created_at.desc",
            self.records_url(),
            owner
        );
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(unavailable)?;
        let response = check_status(response).await?;

        let records: Vec<FileRecord> = response.json().await.map_err(unavailable)?;
        Ok(records)
    }

    async fn create_record(&self, record: NewFileRecord) -> StoreResult<FileRecord> {
        let response = self
            .request(Method::POST, &self.records_url())
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await
            .map_err(unavailable)?;
        let response = check_status(response).await?;

        let rows: Vec<FileRecord> = response.json().await.map_err(unavailable)?;
        rows.into_iter().next().ok_or_else(|| {
            StoreError::Unavailable("insert returned no representation".to_string())
        })
    }

    async fn delete_record(&self, id: Uuid) -> StoreResult<()> {
        let url = format!("{}?id=eq.{}", self.records_url(), id);
        let response = self
            .request(Method::DELETE, &url)
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(unavailable)?;
        let response = check_status(response).await?;

        let rows: Vec<FileRecord> = response.json().await.map_err(unavailable)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(name: &str, ts: i64) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            file_name: name.to_string(),
            remote_locator: format!("https://cdn.example/{name}"),
            mime_type: "image/png".to_string(),
            byte_size: 42,
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn list_preserves_server_order_and_sends_auth() {
        let server = MockServer::start().await;
        let owner = Uuid::new_v4();
        let newer = record("b.txt", 2_000);
        let older = record("a.png", 1_000);

        Mock::given(method("GET"))
            .and(path("/rest/v1/file_records"))
            .and(query_param("owner_id", format!("eq.{owner}")))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(vec![newer.clone(), older.clone()]),
            )
            .mount(&server)
            .await;

        let store = RestMetadataStore::new(server.uri(), "test-key").unwrap();
        let records = store.list_records(owner).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_name, "b.txt");
        assert_eq!(records[1].file_name, "a.png");
    }

    #[tokio::test]
    async fn create_returns_representation() {
        let server = MockServer::start().await;
        let created = record("c.pdf", 3_000);

        Mock::given(method("POST"))
            .and(path("/rest/v1/file_records"))
            .and(header("Prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_json(vec![created.clone()]))
            .mount(&server)
            .await;

        let store = RestMetadataStore::new(server.uri(), "test-key").unwrap();
        let stored = store
            .create_record(NewFileRecord {
                owner_id: created.owner_id,
                file_name: created.file_name.clone(),
                remote_locator: created.remote_locator.clone(),
                mime_type: created.mime_type.clone(),
                byte_size: created.byte_size,
            })
            .await
            .unwrap();

        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn delete_missing_record_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/file_records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<FileRecord>::new()))
            .mount(&server)
            .await;

        let store = RestMetadataStore::new(server.uri(), "test-key").unwrap();
        let id = Uuid::new_v4();
        let err = store.delete_record(id).await.expect_err("expected NotFound");
        assert!(matches!(err, StoreError::NotFound(deleted) if deleted == id));
    }

    #[tokio::test]
    async fn delete_present_record_succeeds() {
        let server = MockServer::start().await;
        let existing = record("d.txt", 4_000);
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/file_records"))
            .and(query_param("id", format!("eq.{}", existing.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![existing.clone()]))
            .mount(&server)
            .await;

        let store = RestMetadataStore::new(server.uri(), "test-key").unwrap();
        store.delete_record(existing.id).await.unwrap();
    }

    #[tokio::test]
    async fn server_errors_map_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/file_records"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let store = RestMetadataStore::new(server.uri(), "test-key").unwrap();
        let err = store
            .list_records(Uuid::new_v4())
            .await
            .expect_err("expected Unavailable");
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn rejection_maps_to_validation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/file_records"))
            .respond_with(ResponseTemplate::new(400).set_body_string("null value in column"))
            .mount(&server)
            .await;

        let store = RestMetadataStore::new(server.uri(), "test-key").unwrap();
        let err = store
            .create_record(NewFileRecord {
                owner_id: Uuid::nil(),
                file_name: String::new(),
                remote_locator: String::new(),
                mime_type: String::new(),
                byte_size: 0,
            })
            .await
            .expect_err("expected ValidationRejected");
        assert!(matches!(err, StoreError::ValidationRejected(_)));
    }
}
