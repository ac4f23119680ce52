// src/infrastructure/audit/capture.rs
use crate::application::ports::time::Clock;
use crate::domain::audit::AuditRecord;
use crate::domain::entity::FieldMap;
use crate::infrastructure::persistence::{EntityState, SavingEvent, TrackedEntry};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Turns the tracked entries of a context about to save into audit records.
/// Pure in-memory work; never touches storage.
#[derive(Clone)]
pub struct ChangeCapture {
    clock: Arc<dyn Clock>,
}

impl ChangeCapture {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn capture(&self, event: &SavingEvent<'_>) -> Vec<AuditRecord> {
        let now = self.clock.now();
        let tenant = event.tenant.audit_label();
        event
            .entries
            .iter()
            .map(|entry| record_for(entry, tenant, event.acting_user, now))
            .collect()
    }
}

fn record_for(
    entry: &TrackedEntry,
    tenant: &str,
    acting_user: Option<&str>,
    now: DateTime<Utc>,
) -> AuditRecord {
    let (old_values, new_values) = match entry.state {
        EntityState::Added => (FieldMap::new(), all_columns(entry, &entry.current)),
        EntityState::Deleted => (all_columns(entry, &entry.original), FieldMap::new()),
        EntityState::Modified => {
            let changed: Vec<&str> = entry.changed_columns().collect();
            (
                pick(&changed, &entry.original),
                pick(&changed, &entry.current),
            )
        }
    };

    AuditRecord {
        id: None,
        table_name: entry.meta.storage_name().to_string(),
        action: entry.state.action(),
        tenant_id: tenant.to_string(),
        user_id: acting_user.map(str::to_string),
        key_values: entry.key_values(),
        old_values,
        new_values,
        created_at: now,
    }
}

fn all_columns(entry: &TrackedEntry, source: &FieldMap) -> FieldMap {
    pick(entry.meta.columns, source)
}

fn pick(columns: &[&str], source: &FieldMap) -> FieldMap {
    columns
        .iter()
        .map(|column| {
            let value = source.get(*column).cloned().unwrap_or_default();
            ((*column).to_string(), value)
        })
        .collect()
}
