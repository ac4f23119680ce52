// src/infrastructure/persistence/context.rs
//! Tenant-scoped unit of work.
//!
//! A [`ScopedPersistenceContext`] is opened once per request. It resolves the
//! tenant a single time, reads only that tenant's rows, stamps the tenant on
//! every insert, and runs the registered [`SaveInterceptor`]s around each
//! commit.

use crate::application::ports::{actor::ActorResolver, tenant::TenantResolver};
use crate::domain::entity::{FieldMap, MustHaveTenant, field_map};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::tenant::{ConnectionDescriptor, TenantScope};
use crate::infrastructure::database::PoolRegistry;
use crate::infrastructure::persistence::{
    error::map_sqlx,
    filter::{self, TenantFilter},
    interceptor::{ContextId, SaveInterceptor, SavedEvent, SavingEvent},
    statement::Statement,
    tracker::{ChangeTracker, EntityState, EntryMeta, TrackedEntry},
};
use serde_json::Value;
use sqlx::{AnyPool, FromRow, Row, any::AnyRow};
use std::{marker::PhantomData, sync::Arc};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

static NULL: Value = Value::Null;

/// Shared, per-process configuration for opening contexts: the pool cache and
/// the interceptors every context runs on save.
#[derive(Clone)]
pub struct ContextFactory {
    registry: PoolRegistry,
    interceptors: Vec<Arc<dyn SaveInterceptor>>,
}

impl ContextFactory {
    pub fn new(registry: PoolRegistry) -> Self {
        Self {
            registry,
            interceptors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn SaveInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    /// Resolve the tenant and actor for the current request and connect.
    ///
    /// Fails with `Configuration` when neither the tenant nor the resolver's
    /// fallback supplies a connection descriptor. A missing tenant with a
    /// usable fallback still opens, bound to [`TenantScope::Unresolved`].
    pub async fn open(
        &self,
        tenants: &dyn TenantResolver,
        actor: &dyn ActorResolver,
    ) -> DomainResult<ScopedPersistenceContext> {
        let tenant = tenants.resolve_current_tenant();
        let connection = match &tenant {
            Some(resolved) => resolved.connection.clone(),
            None => tenants.fallback_connection().ok_or_else(|| {
                DomainError::Configuration(
                    "no connection descriptor available for the current request".into(),
                )
            })?,
        };
        let acting_user = actor.current_acting_user_id();
        let scope = TenantScope::from(tenant.map(|resolved| resolved.tenant_id));

        let pool = self.registry.pool_for(&connection).await?;
        let id = ContextId::new();
        tracing::debug!(context = %id, tenant = scope.audit_label(), "opened persistence context");

        Ok(ScopedPersistenceContext {
            id,
            filter: TenantFilter::new(scope),
            connection,
            pool,
            acting_user,
            tracker: ChangeTracker::default(),
            interceptors: self.interceptors.clone(),
        })
    }
}

pub struct ScopedPersistenceContext {
    id: ContextId,
    filter: TenantFilter,
    connection: ConnectionDescriptor,
    pool: AnyPool,
    acting_user: Option<String>,
    tracker: ChangeTracker,
    interceptors: Vec<Arc<dyn SaveInterceptor>>,
}

impl ScopedPersistenceContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn tenant(&self) -> &TenantScope {
        self.filter.scope()
    }

    pub fn connection(&self) -> &ConnectionDescriptor {
        &self.connection
    }

    pub fn acting_user(&self) -> Option<&str> {
        self.acting_user.as_deref()
    }

    pub fn has_changes(&self) -> bool {
        !self.tracker.is_empty()
    }

    /// Drop every pending change without touching storage.
    pub fn reject_changes(&mut self) {
        self.tracker.reject_all();
    }

    /// Typed collection over a tenant-owned entity.
    pub fn set<T: MustHaveTenant>(&mut self) -> TenantSet<'_, T> {
        TenantSet {
            ctx: self,
            _entity: PhantomData,
        }
    }

    /// Commit pending changes. Returns the number of rows written.
    ///
    /// Cancellation before the commit finishes rolls the whole cycle back.
    /// Cancellation after it only affects the audit flush.
    pub async fn save(&mut self, cancel: &CancellationToken) -> DomainResult<u64> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        self.stamp_tenant()?;
        self.before_save();

        let affected = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(context = %self.id, "save cancelled before commit");
                return Err(DomainError::Cancelled);
            }
            result = self.commit() => result?,
        };
        self.tracker.accept_all();
        tracing::debug!(context = %self.id, affected, "primary commit completed");

        let event = SavedEvent {
            context_id: self.id,
            connection: &self.connection,
            affected,
        };
        for interceptor in &self.interceptors {
            interceptor.saved_changes_async(&event, cancel).await;
        }
        Ok(affected)
    }

    /// Synchronous form of [`save`](Self::save). Must run on a blocking thread
    /// of a tokio runtime, e.g. inside `spawn_blocking`.
    pub fn save_blocking(&mut self) -> DomainResult<u64> {
        let runtime = Handle::try_current().map_err(|_| {
            DomainError::Configuration("blocking save requires a tokio runtime".into())
        })?;
        self.stamp_tenant()?;
        self.before_save();

        let affected = runtime.block_on(self.commit())?;
        self.tracker.accept_all();
        tracing::debug!(context = %self.id, affected, "primary commit completed");

        let event = SavedEvent {
            context_id: self.id,
            connection: &self.connection,
            affected,
        };
        for interceptor in &self.interceptors {
            interceptor.saved_changes(&event);
        }
        Ok(affected)
    }

    /// Every pending insert gets the context's tenant, whatever the caller set.
    fn stamp_tenant(&mut self) -> DomainResult<()> {
        let tenant = self
            .filter
            .scope()
            .tenant_id()
            .map(|id| Value::String(id.as_str().to_string()));

        for entry in self
            .tracker
            .entries_mut()
            .filter(|entry| entry.state == EntityState::Added)
        {
            let Some(tenant) = &tenant else {
                return Err(DomainError::Validation(format!(
                    "cannot insert into {} without a resolved tenant",
                    entry.meta.storage_name()
                )));
            };
            entry
                .current
                .insert(entry.meta.tenant_column.to_string(), tenant.clone());
        }
        Ok(())
    }

    fn before_save(&self) {
        let event = SavingEvent {
            context_id: self.id,
            tenant: self.filter.scope(),
            acting_user: self.acting_user.as_deref(),
            entries: self.tracker.entries(),
        };
        tracing::debug!(context = %self.id, entries = event.entries.len(), "capturing changes");
        for interceptor in &self.interceptors {
            interceptor.saving_changes(&event);
        }
    }

    async fn commit(&self) -> DomainResult<u64> {
        if self.tracker.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut affected = 0;
        for entry in self.tracker.entries() {
            let Some(stmt) = self.statement_for(entry) else {
                continue;
            };
            let result = stmt.query().execute(&mut *tx).await.map_err(map_sqlx)?;
            if result.rows_affected() == 0 {
                return Err(DomainError::Conflict(format!(
                    "{} {} was changed or removed by another request",
                    entry.meta.storage_name(),
                    entry.key
                )));
            }
            affected += result.rows_affected();
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(affected)
    }

    fn statement_for(&self, entry: &TrackedEntry) -> Option<Statement> {
        let meta = &entry.meta;
        let value_of = |column: &str| entry.current.get(column).unwrap_or(&NULL);
        match entry.state {
            EntityState::Added => Some(filter::insert(
                meta.table,
                meta.columns.iter().map(|column| (*column, value_of(*column))),
            )),
            EntityState::Modified => self.filter.update(
                meta.table,
                meta.key,
                meta.tenant_column,
                entry.key,
                entry
                    .changed_columns()
                    .map(|column| (column, value_of(column))),
            ),
            EntityState::Deleted => Some(self.filter.delete(
                meta.table,
                meta.key,
                meta.tenant_column,
                entry.key,
            )),
        }
    }
}

impl Drop for ScopedPersistenceContext {
    fn drop(&mut self) {
        for interceptor in &self.interceptors {
            interceptor.context_disposed(self.id);
        }
    }
}

/// Collection accessor for one tenant-owned entity type. Reads go straight to
/// storage through the tenant filter; writes are tracked until `save`.
pub struct TenantSet<'c, T> {
    ctx: &'c mut ScopedPersistenceContext,
    _entity: PhantomData<fn() -> T>,
}

impl<T> TenantSet<'_, T>
where
    T: MustHaveTenant + for<'r> FromRow<'r, AnyRow>,
{
    pub async fn list(&self) -> DomainResult<Vec<T>> {
        let stmt = self
            .ctx
            .filter
            .select_all(T::TABLE, T::COLUMNS, T::KEY, T::TENANT_COLUMN);
        let rows = stmt
            .query()
            .fetch_all(&self.ctx.pool)
            .await
            .map_err(map_sqlx)?;
        rows.iter()
            .map(|row| T::from_row(row).map_err(map_sqlx))
            .collect()
    }

    /// `None` when the row is absent or belongs to another tenant.
    pub async fn find(&self, id: i64) -> DomainResult<Option<T>> {
        let stmt = self
            .ctx
            .filter
            .select_by_key(T::TABLE, T::COLUMNS, T::KEY, T::TENANT_COLUMN, id);
        let row = stmt
            .query()
            .fetch_optional(&self.ctx.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref()
            .map(T::from_row)
            .transpose()
            .map_err(map_sqlx)
    }

    /// Next free key within the caller's tenant.
    pub async fn next_key(&self) -> DomainResult<i64> {
        let stmt = self
            .ctx
            .filter
            .next_key(T::TABLE, T::KEY, T::TENANT_COLUMN);
        let row = stmt
            .query()
            .fetch_one(&self.ctx.pool)
            .await
            .map_err(map_sqlx)?;
        row.try_get::<i64, _>(0).map_err(map_sqlx)
    }

    /// The context's tenant replaces whatever tenant `entity` carries.
    pub fn add(&mut self, entity: T) -> DomainResult<()> {
        let foreign = entity
            .tenant_id()
            .zip(self.ctx.tenant().tenant_id())
            .filter(|(requested, scope)| *requested != scope.as_str());
        if let Some((requested, scope)) = foreign {
            tracing::debug!(
                table = T::TABLE,
                requested,
                tenant = scope.as_str(),
                "insert carries a foreign tenant; it will be restamped"
            );
        }
        let current = field_map(&entity)?;
        self.ctx
            .tracker
            .track_added(EntryMeta::of::<T>(), entity.key(), current)
    }

    /// Fails with `NotFound` when the row is absent, owned by another tenant, or
    /// pending deletion.
    pub async fn update(&mut self, entity: T) -> DomainResult<()> {
        let key = entity.key();
        let current = field_map(&entity)?;
        if self.ctx.tracker.state_of(T::TABLE, key).is_some() {
            return self.ctx.tracker.replace_current(T::TABLE, key, current);
        }

        let Some(stored) = self.find(key).await? else {
            return Err(DomainError::NotFound(format!("{} {key}", T::TABLE)));
        };
        let original = field_map(&stored)?;
        self.ctx
            .tracker
            .track_modified(EntryMeta::of::<T>(), key, original, current);
        Ok(())
    }

    /// Returns `false` when there is nothing visible to delete.
    pub async fn remove(&mut self, id: i64) -> DomainResult<bool> {
        let original = match self.ctx.tracker.state_of(T::TABLE, id) {
            Some(EntityState::Deleted) => return Ok(false),
            // The tracked entry already holds whatever original state exists.
            Some(EntityState::Added | EntityState::Modified) => FieldMap::new(),
            None => match self.find(id).await? {
                Some(stored) => field_map(&stored)?,
                None => return Ok(false),
            },
        };
        Ok(self
            .ctx
            .tracker
            .track_deleted(EntryMeta::of::<T>(), id, original))
    }
}
