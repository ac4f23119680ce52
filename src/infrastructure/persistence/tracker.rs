// src/infrastructure/persistence/tracker.rs
use crate::domain::audit::AuditAction;
use crate::domain::entity::{FieldMap, MustHaveTenant};
use crate::domain::errors::{DomainError, DomainResult};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
}

impl EntityState {
    pub fn action(&self) -> AuditAction {
        match self {
            Self::Added => AuditAction::Added,
            Self::Modified => AuditAction::Modified,
            Self::Deleted => AuditAction::Deleted,
        }
    }
}

/// Storage metadata captured from the entity type when it is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub table: &'static str,
    pub type_name: &'static str,
    pub key: &'static str,
    pub columns: &'static [&'static str],
    pub tenant_column: &'static str,
}

impl EntryMeta {
    pub fn of<E: MustHaveTenant>() -> Self {
        Self {
            table: E::TABLE,
            type_name: std::any::type_name::<E>(),
            key: E::KEY,
            columns: E::COLUMNS,
            tenant_column: E::TENANT_COLUMN,
        }
    }

    /// Mapped storage name, falling back to the bare type name.
    pub fn storage_name(&self) -> &'static str {
        if self.table.is_empty() {
            self.type_name.rsplit("::").next().unwrap_or(self.type_name)
        } else {
            self.table
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntry {
    pub meta: EntryMeta,
    pub state: EntityState,
    pub key: i64,
    /// Values as loaded from storage. Empty for `Added`.
    pub original: FieldMap,
    /// Values to be written. Ignored for `Deleted`.
    pub current: FieldMap,
}

impl TrackedEntry {
    pub fn key_values(&self) -> FieldMap {
        let source = match self.state {
            EntityState::Deleted => &self.original,
            EntityState::Added | EntityState::Modified => &self.current,
        };
        let value = source
            .get(self.meta.key)
            .cloned()
            .unwrap_or_else(|| Value::from(self.key));
        FieldMap::from_iter([(self.meta.key.to_string(), value)])
    }

    /// Columns whose current value differs from the original, in column order.
    pub fn changed_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.meta
            .columns
            .iter()
            .copied()
            .filter(|column| self.original.get(*column) != self.current.get(*column))
    }

    fn is_unchanged(&self) -> bool {
        self.changed_columns().next().is_none()
    }
}

/// Unit-of-work state for one persistence context.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: Vec<TrackedEntry>,
}

impl ChangeTracker {
    pub fn entries(&self) -> &[TrackedEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut TrackedEntry> {
        self.entries.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn state_of(&self, table: &str, key: i64) -> Option<EntityState> {
        self.position(table, key).map(|idx| self.entries[idx].state)
    }

    fn position(&self, table: &str, key: i64) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.meta.table == table && entry.key == key)
    }

    pub fn track_added(&mut self, meta: EntryMeta, key: i64, current: FieldMap) -> DomainResult<()> {
        match self.position(meta.table, key) {
            None => {
                self.entries.push(TrackedEntry {
                    meta,
                    state: EntityState::Added,
                    key,
                    original: FieldMap::new(),
                    current,
                });
                Ok(())
            }
            Some(idx) if self.entries[idx].state == EntityState::Deleted => {
                // Re-adding a row pending deletion turns into an update of the stored row.
                let entry = &mut self.entries[idx];
                let tenant = entry.original.get(meta.tenant_column).cloned();
                entry.current = current;
                if let Some(tenant) = tenant {
                    entry.current.insert(meta.tenant_column.to_string(), tenant);
                }
                entry.state = EntityState::Modified;
                if entry.is_unchanged() {
                    self.entries.remove(idx);
                }
                Ok(())
            }
            Some(_) => Err(DomainError::Conflict(format!(
                "{} {key} is already tracked",
                meta.storage_name()
            ))),
        }
    }

    /// Record a modification of a row loaded from storage. The stored tenant
    /// column always wins over the payload.
    pub fn track_modified(
        &mut self,
        meta: EntryMeta,
        key: i64,
        original: FieldMap,
        mut current: FieldMap,
    ) {
        if let Some(tenant) = original.get(meta.tenant_column) {
            current.insert(meta.tenant_column.to_string(), tenant.clone());
        }
        let entry = TrackedEntry {
            meta,
            state: EntityState::Modified,
            key,
            original,
            current,
        };
        if !entry.is_unchanged() {
            self.entries.push(entry);
        }
    }

    /// Replace the pending values of an entry that is already `Added` or
    /// `Modified`. Returns `NotFound` for entries pending deletion.
    pub fn replace_current(&mut self, table: &str, key: i64, mut current: FieldMap) -> DomainResult<()> {
        let Some(idx) = self.position(table, key) else {
            return Err(DomainError::NotFound(format!("{table} {key} is not tracked")));
        };
        let entry = &mut self.entries[idx];
        match entry.state {
            EntityState::Deleted => Err(DomainError::NotFound(format!("{table} {key}"))),
            EntityState::Added => {
                entry.current = current;
                Ok(())
            }
            EntityState::Modified => {
                if let Some(tenant) = entry.original.get(entry.meta.tenant_column) {
                    current.insert(entry.meta.tenant_column.to_string(), tenant.clone());
                }
                entry.current = current;
                if entry.is_unchanged() {
                    self.entries.remove(idx);
                }
                Ok(())
            }
        }
    }

    /// Returns `false` when the entry is already pending deletion.
    pub fn track_deleted(&mut self, meta: EntryMeta, key: i64, original: FieldMap) -> bool {
        match self.position(meta.table, key) {
            None => {
                self.entries.push(TrackedEntry {
                    meta,
                    state: EntityState::Deleted,
                    key,
                    original,
                    current: FieldMap::new(),
                });
                true
            }
            Some(idx) => match self.entries[idx].state {
                EntityState::Deleted => false,
                EntityState::Added => {
                    // Never reached storage; forget it.
                    self.entries.remove(idx);
                    true
                }
                EntityState::Modified => {
                    let entry = &mut self.entries[idx];
                    entry.state = EntityState::Deleted;
                    entry.current = FieldMap::new();
                    true
                }
            },
        }
    }

    /// Called after a successful commit.
    pub fn accept_all(&mut self) {
        self.entries.clear();
    }

    pub fn reject_all(&mut self) {
        self.entries.clear();
    }
}
