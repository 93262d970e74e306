//! Transfer channel abstraction
//!
//! This module defines the contract for uploading one file's bytes to the
//! object-storage backend with live progress reporting.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transfer operation errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("upload destination is not configured")]
    ConfigurationMissing,

    #[error("upload payload is empty")]
    EmptyPayload,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upload rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upload response: {0}")]
    MalformedResponse(String),
}

impl TransferError {
    /// Short user-facing message, recorded as a unit's failure reason.
    pub fn client_message(&self) -> String {
        match self {
            TransferError::ConfigurationMissing => "Upload configuration missing".to_string(),
            TransferError::EmptyPayload => "File is empty".to_string(),
            TransferError::Status { status, .. } if *status == 400 || *status == 401 => {
                "Upload failed. Check presets.".to_string()
            }
            TransferError::Status { status, .. } => {
                format!("Upload rejected with status {}", status)
            }
            TransferError::Transport(_) | TransferError::MalformedResponse(_) => {
                "Connection error".to_string()
            }
        }
    }
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

/// Sender half of a per-invocation progress stream. Values are integer
/// percentages, non-decreasing within one invocation.
pub type ProgressSender = mpsc::UnboundedSender<u8>;

/// One file's bytes plus the descriptive fields the backend wants.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Terminal success outcome of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub remote_locator: String,
    pub remote_public_id: String,
}

/// Transfer abstraction trait
///
/// One invocation performs one outbound upload and returns exactly one
/// terminal outcome. Progress events stop once the returned future
/// resolves. The channel never retries internally and never touches the
/// registry; retry policy belongs to the engine.
#[async_trait]
pub trait TransferChannel: Send + Sync {
    async fn begin_transfer(
        &self,
        request: TransferRequest,
        destination: &str,
        progress: ProgressSender,
    ) -> TransferResult<TransferReceipt>;
}
