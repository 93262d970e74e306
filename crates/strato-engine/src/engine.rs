//! Ingestion engine
//!
//! Orchestrates the full unit lifecycle: stage a batch, run one upload task
//! per unit, persist completed uploads, reconcile the registry against the
//! metadata store at startup, and drive optimistic removal and explicit
//! retry. Every failure is contained here: it becomes registry state or a
//! structured log line, never a panic and never an error escaping a task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use strato_core::models::{FileUnit, NewFileRecord, StagedFile, UnitState};
use strato_core::Config;
use strato_store::{MetadataStore, StoreError};
use strato_transfer::{TransferChannel, TransferError, TransferReceipt, TransferRequest};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::registry::{UnitPatch, UnitRegistry};
use crate::session::SessionProvider;

/// Staged payloads kept around so a failed upload can be retried without
/// re-staging the file.
type RetainedMap = Arc<Mutex<HashMap<Uuid, TransferRequest>>>;

pub struct IngestionEngine {
    registry: Arc<UnitRegistry>,
    channel: Arc<dyn TransferChannel>,
    store: Arc<dyn MetadataStore>,
    session: Arc<dyn SessionProvider>,
    retained: RetainedMap,
    destination: String,
    upload_timeout: Duration,
    max_file_size_bytes: usize,
}

impl IngestionEngine {
    pub fn new(
        registry: Arc<UnitRegistry>,
        channel: Arc<dyn TransferChannel>,
        store: Arc<dyn MetadataStore>,
        session: Arc<dyn SessionProvider>,
        destination: impl Into<String>,
        upload_timeout: Duration,
        max_file_size_bytes: usize,
    ) -> Self {
        Self {
            registry,
            channel,
            store,
            session,
            retained: Arc::new(Mutex::new(HashMap::new())),
            destination: destination.into(),
            upload_timeout,
            max_file_size_bytes,
        }
    }

    pub fn from_config(
        registry: Arc<UnitRegistry>,
        channel: Arc<dyn TransferChannel>,
        store: Arc<dyn MetadataStore>,
        session: Arc<dyn SessionProvider>,
        config: &Config,
    ) -> Self {
        Self::new(
            registry,
            channel,
            store,
            session,
            config.transfer_preset.clone(),
            config.upload_timeout(),
            config.max_file_size_bytes,
        )
    }

    /// Stage a batch of files and start one upload task per accepted file.
    ///
    /// The whole batch enters the registry immediately, prepended in input
    /// order. Files over the size limit, and every file when the transfer
    /// destination is not configured, are failed at intake without a
    /// transfer attempt. Returns the new unit ids in input order.
    pub fn ingest_batch(&self, files: Vec<StagedFile>) -> Vec<Uuid> {
        if files.is_empty() {
            return Vec::new();
        }

        let destination_missing = self.destination.is_empty();
        if destination_missing {
            tracing::warn!(
                count = files.len(),
                "transfer destination not configured, failing batch at intake"
            );
        }

        let mut units = Vec::with_capacity(files.len());
        let mut uploads = Vec::new();
        for file in &files {
            let mut unit = FileUnit::staged(file);
            if destination_missing {
                unit.state = UnitState::Failed;
                unit.failure_reason = Some(TransferError::ConfigurationMissing.client_message());
            } else if file.bytes.len() > self.max_file_size_bytes {
                tracing::warn!(
                    name = %file.name,
                    size = file.bytes.len(),
                    limit = self.max_file_size_bytes,
                    "rejecting file over the size limit"
                );
                unit.state = UnitState::Failed;
                unit.failure_reason = Some(format!(
                    "File size exceeds maximum allowed size of {} MB",
                    self.max_file_size_bytes / 1024 / 1024
                ));
            } else {
                uploads.push((
                    unit.id,
                    TransferRequest {
                        name: file.name.clone(),
                        mime_type: file.mime_type.clone(),
                        bytes: file.bytes.clone(),
                    },
                ));
            }
            units.push(unit);
        }

        let ids: Vec<Uuid> = units.iter().map(|unit| unit.id).collect();
        self.registry.insert_batch(units);

        {
            let mut retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
            for (id, request) in &uploads {
                retained.insert(*id, request.clone());
            }
        }
        for (id, request) in uploads {
            self.spawn_upload(id, request);
        }
        ids
    }

    /// Replace the registry with the owner's persisted records, newest
    /// first. Returns the number of units now in the registry view.
    ///
    /// Without an owner scope, and when the store cannot be listed, the
    /// registry is left untouched and 0 is returned.
    pub async fn reconcile(&self) -> usize {
        let Some(owner_id) = self.session.current_owner_scope() else {
            tracing::debug!("no owner scope, skipping reconciliation");
            return 0;
        };

        match self.store.list_records(owner_id).await {
            Ok(records) => {
                let units: Vec<FileUnit> = records.iter().map(FileUnit::from_record).collect();
                let count = units.len();
                self.registry.replace_all(units);
                tracing::info!(owner_id = %owner_id, count = count, "registry reconciled");
                count
            }
            Err(e) => {
                tracing::warn!(
                    owner_id = %owner_id,
                    error = %e,
                    "failed to list file records, registry left as is"
                );
                0
            }
        }
    }

    /// Remove a unit optimistically. The registry entry goes first and never
    /// comes back; the metadata store delete runs best effort in the
    /// background. Returns `false` when the id is not present.
    pub fn remove_unit(&self, id: Uuid) -> bool {
        let Some(unit) = self.registry.remove(id) else {
            return false;
        };
        {
            let mut retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
            retained.remove(&id);
        }

        // Units that finished persisting carry the record id; for the rest
        // the unit id stands in and the delete lands on nothing.
        let target = unit.record_id.unwrap_or(id);
        let store = self.store.clone();
        tokio::spawn(async move {
            match store.delete_record(target).await {
                Ok(()) => {
                    tracing::info!(record_id = %target, "file record deleted");
                }
                Err(StoreError::NotFound(_)) => {
                    tracing::debug!(record_id = %target, "file record already absent");
                }
                Err(e) => {
                    tracing::warn!(record_id = %target, error = %e, "failed to delete file record");
                }
            }
        });
        true
    }

    /// Put a failed unit back on the wire using its retained bytes.
    ///
    /// Returns `false` when the unit is missing, not in `Failed`, or has no
    /// retained payload (intake rejections keep nothing to retry).
    pub fn retry_unit(&self, id: Uuid) -> bool {
        let Some(unit) = self.registry.get(id) else {
            return false;
        };
        if unit.state != UnitState::Failed {
            return false;
        }
        let retained = {
            let slots = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(&id).cloned()
        };
        let Some(request) = retained else {
            return false;
        };

        tracing::info!(unit_id = %id, name = %request.name, "retrying failed upload");
        self.registry.update(
            id,
            UnitPatch::new()
                .state(UnitState::Uploading)
                .progress(0)
                .clear_failure_reason(),
        );
        self.spawn_upload(id, request);
        true
    }

    fn spawn_upload(&self, unit_id: Uuid, request: TransferRequest) {
        let task = UploadRef {
            registry: self.registry.clone(),
            channel: self.channel.clone(),
            store: self.store.clone(),
            session: self.session.clone(),
            retained: self.retained.clone(),
            destination: self.destination.clone(),
            upload_timeout: self.upload_timeout,
        };
        tokio::spawn(async move {
            task.run(unit_id, request).await;
        });
    }
}

/// Reference bundle for one spawned upload task.
struct UploadRef {
    registry: Arc<UnitRegistry>,
    channel: Arc<dyn TransferChannel>,
    store: Arc<dyn MetadataStore>,
    session: Arc<dyn SessionProvider>,
    retained: RetainedMap,
    destination: String,
    upload_timeout: Duration,
}

impl UploadRef {
    async fn run(self, unit_id: Uuid, request: TransferRequest) {
        self.registry
            .update(unit_id, UnitPatch::new().state(UnitState::Uploading));

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let registry = self.registry.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(percent) = progress_rx.recv().await {
                registry.update(
                    unit_id,
                    UnitPatch::new().state(UnitState::Uploading).progress(percent),
                );
            }
        });

        let name = request.name.clone();
        let mime_type = request.mime_type.clone();
        let byte_size = request.bytes.len() as i64;
        tracing::info!(unit_id = %unit_id, name = %name, size = byte_size, "starting transfer");

        let outcome = tokio::time::timeout(
            self.upload_timeout,
            self.channel
                .begin_transfer(request, &self.destination, progress_tx),
        )
        .await;

        // The transfer future and its progress sender are gone either way;
        // drain the forwarder so no progress patch lands after the terminal one.
        let _ = forwarder.await;

        match outcome {
            Ok(Ok(receipt)) => {
                tracing::info!(
                    unit_id = %unit_id,
                    locator = %receipt.remote_locator,
                    "transfer complete"
                );
                self.complete(unit_id, receipt, name, mime_type, byte_size);
            }
            Ok(Err(e)) => {
                tracing::warn!(unit_id = %unit_id, name = %name, error = %e, "transfer failed");
                self.fail(unit_id, e.client_message());
            }
            Err(_) => {
                tracing::warn!(
                    unit_id = %unit_id,
                    name = %name,
                    "transfer exceeded timeout of {:?}",
                    self.upload_timeout
                );
                self.fail(
                    unit_id,
                    format!("Upload timed out after {:?}", self.upload_timeout),
                );
            }
        }
    }

    /// Terminal success: registry patch, then fire-and-forget persistence.
    fn complete(
        self,
        unit_id: Uuid,
        receipt: TransferReceipt,
        name: String,
        mime_type: String,
        byte_size: i64,
    ) {
        {
            let mut retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
            retained.remove(&unit_id);
        }

        self.registry.update(
            unit_id,
            UnitPatch::new()
                .state(UnitState::Completed)
                .progress(100)
                .remote_locator(receipt.remote_locator.clone())
                .remote_public_id(receipt.remote_public_id.clone())
                .preview_reference(receipt.remote_locator.clone()),
        );

        let Some(owner_id) = self.session.current_owner_scope() else {
            tracing::warn!(
                unit_id = %unit_id,
                name = %name,
                "no owner scope, file metadata not persisted"
            );
            return;
        };

        let record = NewFileRecord {
            owner_id,
            file_name: name,
            remote_locator: receipt.remote_locator,
            mime_type,
            byte_size,
        };
        let store = self.store;
        let registry = self.registry;
        tokio::spawn(async move {
            match store.create_record(record).await {
                Ok(saved) => {
                    // The persisted row takes over the unit's identity so a
                    // later removal targets the real record.
                    registry.update(
                        unit_id,
                        UnitPatch::new().record_id(saved.id).replace_id(saved.id),
                    );
                    tracing::info!(
                        unit_id = %unit_id,
                        record_id = %saved.id,
                        "file metadata persisted"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        unit_id = %unit_id,
                        error = %e,
                        "failed to persist file metadata"
                    );
                }
            }
        });
    }

    /// Terminal failure: the retained payload stays for a retry.
    fn fail(&self, unit_id: Uuid, reason: String) {
        self.registry.update(
            unit_id,
            UnitPatch::new()
                .state(UnitState::Failed)
                .progress(0)
                .failure_reason(reason),
        );
    }
}
