// src/infrastructure/persistence/interceptor.rs
use crate::domain::tenant::{ConnectionDescriptor, TenantScope};
use crate::infrastructure::persistence::tracker::TrackedEntry;
use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Correlates the before-save and after-save hooks of one persistence context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Snapshot handed to interceptors right before the primary commit.
#[derive(Debug)]
pub struct SavingEvent<'a> {
    pub context_id: ContextId,
    pub tenant: &'a TenantScope,
    pub acting_user: Option<&'a str>,
    pub entries: &'a [TrackedEntry],
}

/// Handed to interceptors after the primary commit succeeded.
#[derive(Debug)]
pub struct SavedEvent<'a> {
    pub context_id: ContextId,
    pub connection: &'a ConnectionDescriptor,
    pub affected: u64,
}

/// Hooks around `ScopedPersistenceContext::save`. One instance is shared by all
/// contexts, so implementations must key any state by `ContextId`.
///
/// `saving_changes` only inspects in-memory state and is never async. After-save
/// hooks run once the business write is durable and cannot fail the save.
/// `context_disposed` runs when the context is dropped, whether or not its
/// last save committed.
#[async_trait]
pub trait SaveInterceptor: Send + Sync {
    fn saving_changes(&self, event: &SavingEvent<'_>);

    fn saved_changes(&self, event: &SavedEvent<'_>);

    async fn saved_changes_async(&self, event: &SavedEvent<'_>, cancel: &CancellationToken);

    fn context_disposed(&self, _context_id: ContextId) {}
}
