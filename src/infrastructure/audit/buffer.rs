// src/infrastructure/audit/buffer.rs
use crate::domain::audit::AuditRecord;
use crate::infrastructure::persistence::ContextId;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Audit records captured before a commit, waiting for the after-save flush.
/// Each operation takes the lock once, so insert-or-replace and
/// remove-and-return are atomic per key.
#[derive(Debug, Default)]
pub struct PendingAuditBuffer {
    pending: Mutex<HashMap<ContextId, Vec<AuditRecord>>>,
}

impl PendingAuditBuffer {
    fn lock(&self) -> MutexGuard<'_, HashMap<ContextId, Vec<AuditRecord>>> {
        // A panic elsewhere cannot leave the map half-updated.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite the pending list for `id`.
    pub fn replace(&self, id: ContextId, records: Vec<AuditRecord>) {
        self.lock().insert(id, records);
    }

    /// Remove and return the pending list for `id`.
    pub fn take(&self, id: ContextId) -> Option<Vec<AuditRecord>> {
        self.lock().remove(&id)
    }

    pub fn contains(&self, id: ContextId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
