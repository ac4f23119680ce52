// src/application/ports/tenant.rs
use crate::domain::tenant::{ConnectionDescriptor, TenantContext};

/// Resolves the tenant of the current request. Called synchronously when a
/// persistence context is opened.
pub trait TenantResolver: Send + Sync {
    fn resolve_current_tenant(&self) -> Option<TenantContext>;

    /// Descriptor to connect with when no tenant resolves.
    fn fallback_connection(&self) -> Option<ConnectionDescriptor> {
        None
    }
}
