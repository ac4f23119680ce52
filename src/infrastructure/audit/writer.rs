// src/infrastructure/audit/writer.rs
use crate::domain::audit::{AuditRecord, parse_field_map};
use crate::domain::entity::FieldMap;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::tenant::{ConnectionDescriptor, TenantId};
use crate::infrastructure::audit::error::AuditError;
use crate::infrastructure::persistence::error::map_sqlx;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{AnyConnection, AnyPool, Connection, FromRow};

const INSERT_AUDIT_LOG: &str = r#"
    INSERT INTO audit_logs (table_name, action, key_values, old_values, new_values, tenant_id, user_id, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

#[async_trait]
pub trait AuditWriter: Send + Sync {
    /// Persist `records` as one batch against the database `connection` points at.
    async fn write_batch(
        &self,
        connection: &ConnectionDescriptor,
        records: &[AuditRecord],
    ) -> Result<(), AuditError>;
}

/// Opens a dedicated connection per batch so audit rows never share the
/// business transaction.
#[derive(Debug, Default, Clone)]
pub struct SqlAuditWriter;

#[async_trait]
impl AuditWriter for SqlAuditWriter {
    async fn write_batch(
        &self,
        connection: &ConnectionDescriptor,
        records: &[AuditRecord],
    ) -> Result<(), AuditError> {
        sqlx::any::install_default_drivers();
        let mut conn = AnyConnection::connect(connection.url()).await?;
        let result = insert_all(&mut conn, records).await;
        // Released on every path, including a failed insert.
        if let Err(err) = conn.close().await {
            tracing::warn!(error = %err, "failed to close audit connection");
        }
        result
    }
}

async fn insert_all(conn: &mut AnyConnection, records: &[AuditRecord]) -> Result<(), AuditError> {
    let mut tx = conn.begin().await?;
    for record in records {
        sqlx::query(INSERT_AUDIT_LOG)
            .bind(record.table_name.clone())
            .bind(record.action.as_str())
            .bind(serialize_field_map(&record.key_values))
            .bind(serialize_field_map(&record.old_values))
            .bind(serialize_field_map(&record.new_values))
            .bind(record.tenant_id.clone())
            .bind(record.user_id.clone())
            .bind(format_timestamp(record.created_at))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: i64,
    table_name: String,
    action: String,
    key_values: String,
    old_values: String,
    new_values: String,
    tenant_id: String,
    user_id: Option<String>,
    created_at: String,
}

impl TryFrom<AuditLogRow> for AuditRecord {
    type Error = DomainError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|_| DomainError::Validation("invalid audit timestamp".into()))?
            .with_timezone(&Utc);
        Ok(Self {
            id: Some(row.id),
            table_name: row.table_name,
            action: row.action.parse()?,
            tenant_id: row.tenant_id,
            user_id: row.user_id,
            key_values: parse_field_map(&row.key_values)?,
            old_values: parse_field_map(&row.old_values)?,
            new_values: parse_field_map(&row.new_values)?,
            created_at,
        })
    }
}

/// Tenant-scoped read side of `audit_logs`.
#[derive(Clone)]
pub struct SqlAuditLogReader {
    pool: AnyPool,
}

impl SqlAuditLogReader {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub async fn list_for_tenant(&self, tenant: &TenantId, limit: u32) -> DomainResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT id, table_name, action, key_values, old_values, new_values, tenant_id, user_id, created_at \
             FROM audit_logs WHERE tenant_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(tenant.as_str().to_string())
        .bind(i64::from(limit.max(1)))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }
}

/// Field maps serialize to `{}` when empty, never to null.
pub fn serialize_field_map(map: &FieldMap) -> String {
    serde_json::Value::Object(map.clone()).to_string()
}
