// tests/support/mocks.rs
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tenant_audit::application::ports::tenant::TenantResolver;
use tenant_audit::domain::audit::AuditRecord;
use tenant_audit::domain::tenant::{ConnectionDescriptor, TenantContext, TenantId};
use tenant_audit::infrastructure::audit::{AuditError, AuditWriter, SqlAuditWriter};
use tokio_util::sync::CancellationToken;

/// Resolver with a fixed answer, as if tenant resolution already ran.
#[derive(Clone, Default)]
pub struct StaticTenant {
    pub tenant: Option<TenantContext>,
    pub fallback: Option<ConnectionDescriptor>,
}

impl StaticTenant {
    pub fn resolved(tenant: &str, connection: &ConnectionDescriptor) -> Self {
        Self {
            tenant: Some(TenantContext {
                tenant_id: TenantId::new(tenant).expect("tenant id"),
                connection: connection.clone(),
            }),
            fallback: None,
        }
    }

    /// No tenant, but a database to connect to.
    pub fn unresolved(connection: &ConnectionDescriptor) -> Self {
        Self {
            tenant: None,
            fallback: Some(connection.clone()),
        }
    }
}

impl TenantResolver for StaticTenant {
    fn resolve_current_tenant(&self) -> Option<TenantContext> {
        self.tenant.clone()
    }

    fn fallback_connection(&self) -> Option<ConnectionDescriptor> {
        self.fallback.clone()
    }
}

/// Delegates to the SQL writer and counts the batches it was handed.
#[derive(Default)]
pub struct CountingAuditWriter {
    inner: SqlAuditWriter,
    batches: AtomicUsize,
}

impl CountingAuditWriter {
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditWriter for CountingAuditWriter {
    async fn write_batch(
        &self,
        connection: &ConnectionDescriptor,
        records: &[AuditRecord],
    ) -> Result<(), AuditError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.inner.write_batch(connection, records).await
    }
}

/// Cancels the save's token as soon as the flush starts, then never finishes.
pub struct CancellingAuditWriter {
    pub token: CancellationToken,
}

#[async_trait]
impl AuditWriter for CancellingAuditWriter {
    async fn write_batch(
        &self,
        _connection: &ConnectionDescriptor,
        _records: &[AuditRecord],
    ) -> Result<(), AuditError> {
        self.token.cancel();
        std::future::pending::<()>().await;
        Ok(())
    }
}
