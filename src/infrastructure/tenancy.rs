// src/infrastructure/tenancy.rs
use crate::application::ports::tenant::TenantResolver;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::tenant::{ConnectionDescriptor, TenantContext, TenantId};
use serde::Deserialize;
use std::{collections::HashMap, path::Path, sync::Arc};

/// Tenant settings document, usually loaded from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantSettings {
    pub defaults: TenantDefaults,
    #[serde(default)]
    pub tenants: Vec<TenantEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantDefaults {
    pub provider: String,
    pub connection_string: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Falls back to the defaults when absent.
    #[serde(default)]
    pub connection_string: Option<String>,
}

impl TenantSettings {
    /// Settings with no tenants; every request resolves to the defaults only.
    pub fn defaults_only(
        provider: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            defaults: TenantDefaults {
                provider: provider.into(),
                connection_string: connection_string.into(),
            },
            tenants: Vec::new(),
        }
    }

    pub fn from_json(raw: &str) -> DomainResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| DomainError::Configuration(format!("invalid tenant settings: {err}")))
    }

    pub fn from_path(path: &Path) -> DomainResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            DomainError::Configuration(format!(
                "cannot read tenant settings {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    name: String,
    context: TenantContext,
}

/// Validated, immutable view of [`TenantSettings`].
#[derive(Debug)]
pub struct TenantCatalog {
    defaults: ConnectionDescriptor,
    tenants: HashMap<String, CatalogEntry>,
}

impl TenantCatalog {
    pub fn from_settings(settings: &TenantSettings) -> DomainResult<Self> {
        let provider = settings.defaults.provider.as_str();
        let defaults =
            ConnectionDescriptor::new(provider, settings.defaults.connection_string.clone())?;

        let mut tenants = HashMap::with_capacity(settings.tenants.len());
        for entry in &settings.tenants {
            let tenant_id = TenantId::new(entry.id.clone()).map_err(|_| {
                DomainError::Configuration("tenant settings contain an empty tenant id".into())
            })?;
            let connection = match &entry.connection_string {
                Some(url) if !url.trim().is_empty() => {
                    ConnectionDescriptor::new(provider, url.clone())?
                }
                _ => defaults.clone(),
            };
            let key = tenant_id.as_str().to_string();
            if tenants.contains_key(&key) {
                return Err(DomainError::Configuration(format!(
                    "tenant {key} is configured more than once"
                )));
            }
            tenants.insert(
                key,
                CatalogEntry {
                    name: entry.name.clone(),
                    context: TenantContext {
                        tenant_id,
                        connection,
                    },
                },
            );
        }

        tracing::info!(
            tenants = tenants.len(),
            provider = %defaults.provider(),
            "tenant catalog loaded"
        );
        Ok(Self { defaults, tenants })
    }

    pub fn lookup(&self, tenant: &str) -> Option<&TenantContext> {
        self.tenants.get(tenant.trim()).map(|entry| &entry.context)
    }

    pub fn display_name(&self, tenant: &str) -> Option<&str> {
        self.tenants.get(tenant.trim()).map(|entry| entry.name.as_str())
    }

    pub fn default_connection(&self) -> &ConnectionDescriptor {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Resolver for one request that asked for `requested`.
    pub fn resolver(self: &Arc<Self>, requested: Option<&str>) -> CatalogTenantResolver {
        CatalogTenantResolver {
            catalog: Arc::clone(self),
            requested: requested.map(|raw| raw.trim().to_string()),
        }
    }
}

/// Resolves against the catalog. Unknown tenants resolve to nothing, which
/// scopes the context to no rows at all.
#[derive(Debug, Clone)]
pub struct CatalogTenantResolver {
    catalog: Arc<TenantCatalog>,
    requested: Option<String>,
}

impl CatalogTenantResolver {
    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }
}

impl TenantResolver for CatalogTenantResolver {
    fn resolve_current_tenant(&self) -> Option<TenantContext> {
        let requested = self.requested.as_deref()?;
        let resolved = self.catalog.lookup(requested).cloned();
        if resolved.is_none() {
            tracing::debug!(tenant = requested, "requested tenant is not configured");
        }
        resolved
    }

    fn fallback_connection(&self) -> Option<ConnectionDescriptor> {
        Some(self.catalog.default_connection().clone())
    }
}
