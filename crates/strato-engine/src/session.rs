//! Owner scope resolution.

use uuid::Uuid;

/// Resolves the owner scope metadata operations run under.
///
/// `None` means nobody is signed in: reconciliation yields an empty view
/// and completed uploads are not persisted.
pub trait SessionProvider: Send + Sync {
    fn current_owner_scope(&self) -> Option<Uuid>;
}

/// Fixed scope for hosts with a single known user, and for tests.
pub struct StaticSession {
    owner: Option<Uuid>,
}

impl StaticSession {
    pub fn signed_in(owner: Uuid) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn anonymous() -> Self {
        Self { owner: None }
    }
}

impl SessionProvider for StaticSession {
    fn current_owner_scope(&self) -> Option<Uuid> {
        self.owner
    }
}
