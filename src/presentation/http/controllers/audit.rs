// src/presentation/http/controllers/audit.rs
use crate::application::dto::AuditLogDto;
use crate::presentation::http::error::{HttpResult, IntoHttpResult};
use crate::presentation::http::extractors::RequestScope;
use crate::presentation::http::state::HttpState;
use axum::{Extension, Json, extract::Query};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListAuditParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

pub async fn list_audit_logs(
    Extension(state): Extension<HttpState>,
    scope: RequestScope,
    Query(params): Query<ListAuditParams>,
) -> HttpResult<Json<Vec<AuditLogDto>>> {
    let tenants = state.resolver(&scope);
    let logs = state
        .audit_logs
        .list(&tenants, params.limit)
        .await
        .into_http()?;
    Ok(Json(logs))
}
