// src/presentation/http/state.rs
use crate::application::{
    ApplicationResult,
    ports::actor::FixedActor,
    services::{AuditLogService, ProductService},
};
use crate::infrastructure::{
    persistence::{ContextFactory, ScopedPersistenceContext},
    tenancy::{CatalogTenantResolver, TenantCatalog},
};
use crate::presentation::http::extractors::RequestScope;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct HttpState {
    pub factory: Arc<ContextFactory>,
    pub catalog: Arc<TenantCatalog>,
    pub products: ProductService,
    pub audit_logs: AuditLogService,
}

impl HttpState {
    pub fn new(factory: Arc<ContextFactory>, catalog: Arc<TenantCatalog>, shutdown: CancellationToken) -> Self {
        let audit_logs = AuditLogService::new(factory.registry().clone());
        Self {
            factory,
            catalog,
            products: ProductService::new(shutdown),
            audit_logs,
        }
    }

    pub fn resolver(&self, scope: &RequestScope) -> CatalogTenantResolver {
        self.catalog.resolver(scope.tenant.as_deref())
    }

    /// One persistence context per request.
    pub async fn open_context(&self, scope: &RequestScope) -> ApplicationResult<ScopedPersistenceContext> {
        let tenants = self.resolver(scope);
        let actor = FixedActor(scope.user.clone());
        Ok(self.factory.open(&tenants, &actor).await?)
    }
}
