// src/application/services/audit.rs
use crate::application::{dto::AuditLogDto, error::ApplicationResult, ports::tenant::TenantResolver};
use crate::infrastructure::{audit::SqlAuditLogReader, database::PoolRegistry};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

/// Read side of the audit trail, always restricted to the caller's tenant.
#[derive(Clone)]
pub struct AuditLogService {
    registry: PoolRegistry,
}

impl AuditLogService {
    pub fn new(registry: PoolRegistry) -> Self {
        Self { registry }
    }

    /// Newest first. A request without a resolvable tenant sees nothing.
    pub async fn list(
        &self,
        tenants: &dyn TenantResolver,
        limit: Option<u32>,
    ) -> ApplicationResult<Vec<AuditLogDto>> {
        let Some(tenant) = tenants.resolve_current_tenant() else {
            return Ok(Vec::new());
        };
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let pool = self.registry.pool_for(&tenant.connection).await?;
        let records = SqlAuditLogReader::new(pool)
            .list_for_tenant(&tenant.tenant_id, limit)
            .await?;
        Ok(records.into_iter().map(AuditLogDto::from).collect())
    }
}
