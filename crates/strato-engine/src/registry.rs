//! In-memory file unit registry.
//!
//! The registry is the single authority for what the embedding host renders:
//! an ordered collection of [`FileUnit`]s, newest first. Mutations are
//! synchronous and atomic under one `RwLock`; upload tasks, reconciliation
//! and user-driven removal all go through it concurrently. Every mutation
//! is announced on the [`RegistryEvents`] bus after the lock is released.

use std::sync::{PoisonError, RwLock};

use strato_core::models::{FileUnit, UnitState};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::events::{RegistryEvent, RegistryEvents, EVENT_CAPACITY};

/// Partial update applied to one unit in place.
///
/// Unset fields are left untouched. `replace_id` swaps the unit's identity
/// without moving its slot, used when a persisted record takes over from
/// the client-generated intake id.
#[derive(Debug, Clone, Default)]
pub struct UnitPatch {
    state: Option<UnitState>,
    progress_percent: Option<u8>,
    remote_locator: Option<String>,
    remote_public_id: Option<String>,
    preview_reference: Option<String>,
    record_id: Option<Uuid>,
    failure_reason: Option<String>,
    clear_failure_reason: bool,
    replace_id: Option<Uuid>,
}

impl UnitPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: UnitState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn progress(mut self, percent: u8) -> Self {
        self.progress_percent = Some(percent);
        self
    }

    pub fn remote_locator(mut self, locator: impl Into<String>) -> Self {
        self.remote_locator = Some(locator.into());
        self
    }

    pub fn remote_public_id(mut self, public_id: impl Into<String>) -> Self {
        self.remote_public_id = Some(public_id.into());
        self
    }

    pub fn preview_reference(mut self, reference: impl Into<String>) -> Self {
        self.preview_reference = Some(reference.into());
        self
    }

    pub fn record_id(mut self, id: Uuid) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn clear_failure_reason(mut self) -> Self {
        self.clear_failure_reason = true;
        self
    }

    pub fn replace_id(mut self, id: Uuid) -> Self {
        self.replace_id = Some(id);
        self
    }

    fn apply(self, unit: &mut FileUnit) {
        if let Some(state) = self.state {
            unit.state = state;
        }
        if let Some(percent) = self.progress_percent {
            unit.progress_percent = percent;
        }
        if let Some(locator) = self.remote_locator {
            unit.remote_locator = Some(locator);
        }
        if let Some(public_id) = self.remote_public_id {
            unit.remote_public_id = Some(public_id);
        }
        if let Some(reference) = self.preview_reference {
            unit.preview_reference = Some(reference);
        }
        if let Some(record_id) = self.record_id {
            unit.record_id = Some(record_id);
        }
        if self.clear_failure_reason {
            unit.failure_reason = None;
        } else if let Some(reason) = self.failure_reason {
            unit.failure_reason = Some(reason);
        }
        if let Some(id) = self.replace_id {
            unit.id = id;
        }
    }
}

/// Ordered, observable collection of file units.
pub struct UnitRegistry {
    units: RwLock<Vec<FileUnit>>,
    events: RegistryEvents,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::with_event_capacity(EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            units: RwLock::new(Vec::new()),
            events: RegistryEvents::new(capacity),
        }
    }

    /// Prepend a batch, preserving its relative order. Empty batches are a
    /// no-op and emit nothing.
    pub fn insert_batch(&self, units: Vec<FileUnit>) {
        if units.is_empty() {
            return;
        }
        let unit_ids: Vec<Uuid> = units.iter().map(|unit| unit.id).collect();
        {
            let mut slots = self.units.write().unwrap_or_else(PoisonError::into_inner);
            slots.splice(0..0, units);
        }
        self.events.emit(RegistryEvent::BatchInserted { unit_ids });
    }

    /// Merge a patch into the unit with the given id.
    ///
    /// Returns `false` without emitting when the id is absent; a unit
    /// removed while its upload is still in flight makes late patches
    /// land here, and they must disappear silently.
    pub fn update(&self, id: Uuid, patch: UnitPatch) -> bool {
        let updated = {
            let mut slots = self.units.write().unwrap_or_else(PoisonError::into_inner);
            slots.iter_mut().find(|unit| unit.id == id).map(|unit| {
                patch.apply(unit);
                unit.id
            })
        };
        match updated {
            Some(unit_id) => {
                self.events.emit(RegistryEvent::UnitChanged { unit_id });
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: Uuid) -> Option<FileUnit> {
        let removed = {
            let mut slots = self.units.write().unwrap_or_else(PoisonError::into_inner);
            slots
                .iter()
                .position(|unit| unit.id == id)
                .map(|index| slots.remove(index))
        };
        if removed.is_some() {
            self.events.emit(RegistryEvent::UnitRemoved { unit_id: id });
        }
        removed
    }

    /// Swap the full collection. Reconciliation only; the input order is the
    /// new display order.
    pub fn replace_all(&self, units: Vec<FileUnit>) {
        let count = units.len();
        {
            let mut slots = self.units.write().unwrap_or_else(PoisonError::into_inner);
            *slots = units;
        }
        self.events.emit(RegistryEvent::Replaced { count });
    }

    pub fn get(&self, id: Uuid) -> Option<FileUnit> {
        let slots = self.units.read().unwrap_or_else(PoisonError::into_inner);
        slots.iter().find(|unit| unit.id == id).cloned()
    }

    pub fn snapshot(&self) -> Vec<FileUnit> {
        self.units
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.units.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use strato_core::models::StagedFile;
    use tokio::sync::broadcast::error::TryRecvError;

    fn unit(name: &str) -> FileUnit {
        FileUnit::staged(&StagedFile {
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"pixels"),
            preview_reference: None,
        })
    }

    fn names(registry: &UnitRegistry) -> Vec<String> {
        registry.snapshot().into_iter().map(|u| u.name).collect()
    }

    #[test]
    fn later_batches_come_first() {
        let registry = UnitRegistry::new();
        registry.insert_batch(vec![unit("a1"), unit("a2")]);
        registry.insert_batch(vec![unit("b1"), unit("b2")]);

        assert_eq!(names(&registry), vec!["b1", "b2", "a1", "a2"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn update_merges_only_set_fields() {
        let registry = UnitRegistry::new();
        let staged = unit("a.png");
        let id = staged.id;
        registry.insert_batch(vec![staged]);

        assert!(registry.update(id, UnitPatch::new().state(UnitState::Uploading).progress(40)));
        let current = registry.get(id).unwrap();
        assert_eq!(current.state, UnitState::Uploading);
        assert_eq!(current.progress_percent, 40);
        assert_eq!(current.name, "a.png");
        assert!(current.remote_locator.is_none());
    }

    #[test]
    fn update_missing_id_is_silent() {
        let registry = UnitRegistry::new();
        registry.insert_batch(vec![unit("a.png")]);
        let mut rx = registry.subscribe();

        assert!(!registry.update(Uuid::new_v4(), UnitPatch::new().progress(10)));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_returns_the_unit_once() {
        let registry = UnitRegistry::new();
        let staged = unit("a.png");
        let id = staged.id;
        registry.insert_batch(vec![staged]);

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn replace_all_swaps_contents_and_order() {
        let registry = UnitRegistry::new();
        registry.insert_batch(vec![unit("old")]);

        registry.replace_all(vec![unit("newest"), unit("older")]);
        assert_eq!(names(&registry), vec!["newest", "older"]);
    }

    #[test]
    fn replace_id_keeps_the_slot() {
        let registry = UnitRegistry::new();
        let first = unit("first");
        let second = unit("second");
        let old_id = first.id;
        registry.insert_batch(vec![first, second]);

        let new_id = Uuid::new_v4();
        assert!(registry.update(old_id, UnitPatch::new().replace_id(new_id).record_id(new_id)));

        assert!(registry.get(old_id).is_none());
        let swapped = registry.get(new_id).unwrap();
        assert_eq!(swapped.record_id, Some(new_id));
        assert_eq!(names(&registry), vec!["first", "second"]);
    }

    #[test]
    fn clear_failure_reason_wins_over_set() {
        let registry = UnitRegistry::new();
        let mut staged = unit("a.png");
        staged.failure_reason = Some("Connection error".to_string());
        let id = staged.id;
        registry.insert_batch(vec![staged]);

        assert!(registry.update(id, UnitPatch::new().clear_failure_reason()));
        assert!(registry.get(id).unwrap().failure_reason.is_none());
    }

    #[tokio::test]
    async fn every_mutation_emits_one_event() {
        let registry = UnitRegistry::new();
        let mut rx = registry.subscribe();

        let staged = unit("a.png");
        let id = staged.id;
        registry.insert_batch(vec![staged]);
        registry.update(id, UnitPatch::new().progress(50));
        registry.remove(id);
        registry.replace_all(vec![unit("other")]);

        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::BatchInserted { unit_ids: vec![id] }
        );
        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::UnitChanged { unit_id: id });
        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::UnitRemoved { unit_id: id });
        assert_eq!(rx.recv().await.unwrap(), RegistryEvent::Replaced { count: 1 });
    }

    #[test]
    fn empty_batch_emits_nothing() {
        let registry = UnitRegistry::new();
        let mut rx = registry.subscribe();

        registry.insert_batch(Vec::new());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert!(registry.is_empty());
    }
}
