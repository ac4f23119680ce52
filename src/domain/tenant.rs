// src/domain/tenant.rs
use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Label stamped on audit records captured while no tenant was resolved.
pub const UNKNOWN_TENANT: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Validation("tenant id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// The tenant a persistence context is bound to. `Unresolved` is the fail-closed
/// sentinel: filters built from it match no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    Tenant(TenantId),
    Unresolved,
}

impl TenantScope {
    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            Self::Tenant(id) => Some(id),
            Self::Unresolved => None,
        }
    }

    pub fn audit_label(&self) -> &str {
        self.tenant_id().map_or(UNKNOWN_TENANT, TenantId::as_str)
    }
}

impl From<Option<TenantId>> for TenantScope {
    fn from(value: Option<TenantId>) -> Self {
        value.map_or(Self::Unresolved, Self::Tenant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Sqlite,
    Postgres,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    fn accepts_url(self, url: &str) -> bool {
        match self {
            Self::Sqlite => url.starts_with("sqlite:"),
            Self::Postgres => url.starts_with("postgres://") || url.starts_with("postgresql://"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "" => Err(DomainError::Configuration(
                "database provider is not specified".into(),
            )),
            other => Err(DomainError::Configuration(format!(
                "unsupported database provider: {other}"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a tenant's rows live. Validated on construction so a context can never
/// be opened against a half-configured provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    provider: ProviderKind,
    url: String,
}

impl ConnectionDescriptor {
    pub fn new(provider: &str, url: impl Into<String>) -> DomainResult<Self> {
        let provider = provider.parse::<ProviderKind>()?;
        let url = url.into().trim().to_string();
        if url.is_empty() {
            return Err(DomainError::Configuration(
                "connection string is empty".into(),
            ));
        }
        if !provider.accepts_url(&url) {
            return Err(DomainError::Configuration(format!(
                "connection string does not match provider {provider}"
            )));
        }
        Ok(Self { provider, url })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

// Connection strings may embed credentials; keep them out of logs.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("provider", &self.provider)
            .field("url", &"<redacted>")
            .finish()
    }
}

/// Output of tenant resolution for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub connection: ConnectionDescriptor,
}
