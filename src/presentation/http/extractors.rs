// src/presentation/http/extractors.rs
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;

pub const TENANT_HEADER: &str = "tenant";
pub const USER_HEADER: &str = "x-user-id";

/// Tenant and acting user as the client asked for them. Nothing here is
/// trusted yet; the tenant catalog decides what the tenant id means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestScope {
    pub tenant: Option<String>,
    pub user: Option<String>,
}

impl RequestScope {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            tenant: header_value(headers, TENANT_HEADER),
            user: header_value(headers, USER_HEADER),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
