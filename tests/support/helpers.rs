// tests/support/helpers.rs
use std::sync::Arc;
use tempfile::TempDir;
use tenant_audit::application::ports::actor::FixedActor;
use tenant_audit::application::ports::tenant::TenantResolver;
use tenant_audit::domain::audit::AuditRecord;
use tenant_audit::domain::tenant::{ConnectionDescriptor, TenantId};
use tenant_audit::infrastructure::audit::{
    AuditInterceptor, AuditWriter, SqlAuditLogReader, SqlAuditWriter, audit_interceptor,
};
use tenant_audit::infrastructure::database::PoolRegistry;
use tenant_audit::infrastructure::persistence::{ContextFactory, ScopedPersistenceContext};
use tenant_audit::infrastructure::time::FixedClock;

use super::mocks::StaticTenant;

/// File-backed SQLite database living as long as the value.
pub struct TestDb {
    _dir: TempDir,
    pub connection: ConnectionDescriptor,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tenant.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let connection = ConnectionDescriptor::new("sqlite", url).expect("descriptor");
        Self {
            _dir: dir,
            connection,
        }
    }

    pub fn tenant(&self, id: &str) -> StaticTenant {
        StaticTenant::resolved(id, &self.connection)
    }

    pub fn no_tenant(&self) -> StaticTenant {
        StaticTenant::unresolved(&self.connection)
    }
}

pub fn fixed_clock() -> FixedClock {
    FixedClock(
        chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .expect("timestamp")
            .with_timezone(&chrono::Utc),
    )
}

/// Factory with the audit interceptor registered; the interceptor is returned
/// too so tests can inspect its pending buffer.
pub fn audited_factory(writer: Arc<dyn AuditWriter>) -> (ContextFactory, Arc<AuditInterceptor>) {
    let interceptor = Arc::new(audit_interceptor(Arc::new(fixed_clock()), writer));
    let factory = ContextFactory::new(PoolRegistry::new(4)).with_interceptor(interceptor.clone());
    (factory, interceptor)
}

pub fn default_factory() -> (ContextFactory, Arc<AuditInterceptor>) {
    audited_factory(Arc::new(SqlAuditWriter))
}

pub async fn open(
    factory: &ContextFactory,
    tenant: &dyn TenantResolver,
    user: Option<&str>,
) -> ScopedPersistenceContext {
    factory
        .open(tenant, &FixedActor(user.map(str::to_string)))
        .await
        .expect("open context")
}

pub async fn audit_logs(factory: &ContextFactory, db: &TestDb, tenant: &str) -> Vec<AuditRecord> {
    let pool = factory.registry().pool_for(&db.connection).await.expect("pool");
    SqlAuditLogReader::new(pool)
        .list_for_tenant(&TenantId::new(tenant).expect("tenant id"), 100)
        .await
        .expect("audit logs")
}
