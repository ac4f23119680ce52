use crate::domain::audit::AuditRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogDto {
    pub id: Option<i64>,
    pub table_name: String,
    pub action: String,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub key_values: Value,
    pub old_values: Value,
    pub new_values: Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditLogDto {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id,
            table_name: record.table_name,
            action: record.action.to_string(),
            tenant_id: record.tenant_id,
            user_id: record.user_id,
            key_values: Value::Object(record.key_values),
            old_values: Value::Object(record.old_values),
            new_values: Value::Object(record.new_values),
            created_at: record.created_at,
        }
    }
}
