//! HTTP transfer channel
//!
//! Streams a multipart upload to the object-storage endpoint and reports
//! integer percent progress as body chunks are handed to the transport.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use strato_core::Config;

use crate::traits::{
    ProgressSender, TransferChannel, TransferError, TransferReceipt, TransferRequest,
    TransferResult,
};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const CHUNK_SIZE: usize = 64 * 1024;

/// Uploads through an unsigned Cloudinary-style endpoint:
/// `POST {base_url}/auto/upload` with multipart fields `file` and
/// `upload_preset`. A 2xx response carries a JSON body with `secure_url`
/// and `public_id`.
pub struct HttpTransferChannel {
    client: Client,
    base_url: String,
}

impl HttpTransferChannel {
    pub fn new(base_url: impl Into<String>) -> TransferResult<Self> {
        // No total request timeout here: the engine owns the upload
        // deadline and large payloads stream for arbitrary lengths.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> TransferResult<Self> {
        Self::new(config.transfer_url.clone())
    }
}

#[async_trait]
impl TransferChannel for HttpTransferChannel {
    async fn begin_transfer(
        &self,
        request: TransferRequest,
        destination: &str,
        progress: ProgressSender,
    ) -> TransferResult<TransferReceipt> {
        if self.base_url.trim().is_empty() || destination.trim().is_empty() {
            return Err(TransferError::ConfigurationMissing);
        }
        if request.bytes.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        let url = format!("{}/auto/upload", self.base_url);
        let total = request.bytes.len() as u64;

        let body = progress_body(request.bytes.clone(), progress);
        let mut part = Part::stream_with_length(body, total).file_name(request.name.clone());
        if !request.mime_type.is_empty() {
            part = part.mime_str(&request.mime_type)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", destination.to_string());

        tracing::debug!(name = %request.name, size = total, "starting upload");

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransferError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: UploadResponse = response
            .json()
            .await
            .map_err(|e| TransferError::MalformedResponse(e.to_string()))?;

        let remote_locator = payload.secure_url.ok_or_else(|| {
            TransferError::MalformedResponse("secure_url missing from response".to_string())
        })?;
        let remote_public_id = payload.public_id.ok_or_else(|| {
            TransferError::MalformedResponse("public_id missing from response".to_string())
        })?;

        Ok(TransferReceipt {
            remote_locator,
            remote_public_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
}

struct ProgressState {
    remaining: Bytes,
    sent: u64,
    total: u64,
    last_percent: u8,
    progress: ProgressSender,
}

/// Chunk the payload into a request body, emitting the integer percent
/// each time it grows. Chunks are yielded lazily, so emission tracks the
/// transport's consumption of the body.
fn progress_body(bytes: Bytes, progress: ProgressSender) -> Body {
    let state = ProgressState {
        total: bytes.len() as u64,
        remaining: bytes,
        sent: 0,
        last_percent: 0,
        progress,
    };
    let stream = stream::unfold(state, |mut state| async move {
        if state.remaining.is_empty() {
            return None;
        }
        let take = state.remaining.len().min(CHUNK_SIZE);
        let chunk = state.remaining.split_to(take);
        state.sent += take as u64;
        let percent = ((state.sent * 100) / state.total) as u8;
        if percent > state.last_percent {
            state.last_percent = percent;
            let _ = state.progress.send(percent);
        }
        Some((Ok::<Bytes, std::io::Error>(chunk), state))
    });
    Body::wrap_stream(stream)
}
