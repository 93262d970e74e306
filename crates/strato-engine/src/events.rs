//! Registry change notifications.
//!
//! Every registry mutation is announced over a `tokio::sync::broadcast`
//! channel so embedding hosts can re-render without polling. Slow receivers
//! that fall behind get a `Lagged` error and miss events; consumers that
//! need completeness should take a fresh snapshot after a lag.

use tokio::sync::broadcast;
use uuid::Uuid;

/// Default broadcast buffer size.
pub const EVENT_CAPACITY: usize = 256;

/// A single registry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A batch of new units was prepended.
    BatchInserted { unit_ids: Vec<Uuid> },
    /// One unit's fields changed. Carries the unit's current id, which
    /// differs from the pre-mutation id after a persistence id swap.
    UnitChanged { unit_id: Uuid },
    /// One unit was removed.
    UnitRemoved { unit_id: Uuid },
    /// The whole collection was replaced by reconciliation.
    Replaced { count: usize },
}

impl RegistryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryEvent::BatchInserted { .. } => "batch_inserted",
            RegistryEvent::UnitChanged { .. } => "unit_changed",
            RegistryEvent::UnitRemoved { .. } => "unit_removed",
            RegistryEvent::Replaced { .. } => "replaced",
        }
    }
}

/// Broadcast fan-out for [`RegistryEvent`]s.
///
/// Emitting with no subscribers is fine; the event is dropped.
pub struct RegistryEvents {
    tx: broadcast::Sender<RegistryEvent>,
}

impl RegistryEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: RegistryEvent) {
        tracing::trace!(event = event.kind(), "registry event");
        let _ = self.tx.send(event);
    }

    /// Each subscriber gets its own independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RegistryEvents {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}
