// src/domain/audit.rs
use crate::domain::entity::FieldMap;
use crate::domain::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Added,
    Modified,
    Deleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Modified => "Modified",
            Self::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Added" => Ok(Self::Added),
            "Modified" => Ok(Self::Modified),
            "Deleted" => Ok(Self::Deleted),
            other => Err(DomainError::Validation(format!(
                "unknown audit action: {other}"
            ))),
        }
    }
}

/// One captured mutation. `old_values` and `new_values` are always present and
/// serialize to `{}` when logically empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub id: Option<i64>,
    pub table_name: String,
    pub action: AuditAction,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub key_values: FieldMap,
    pub old_values: FieldMap,
    pub new_values: FieldMap,
    pub created_at: DateTime<Utc>,
}

/// Parse a stored field map column. Anything other than a JSON object is
/// rejected.
pub fn parse_field_map(raw: &str) -> DomainResult<FieldMap> {
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(DomainError::Validation(
            "audit field map is not an object".into(),
        )),
        Err(err) => Err(DomainError::Validation(format!(
            "audit field map is not valid json: {err}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip_through_storage_text() {
        for action in [AuditAction::Added, AuditAction::Modified, AuditAction::Deleted] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("Insert".parse::<AuditAction>().is_err());
    }

    #[test]
    fn parse_field_map_accepts_empty_object_only_shape() {
        assert!(parse_field_map("{}").unwrap().is_empty());
        assert!(parse_field_map("[]").is_err());
        assert!(parse_field_map("not json").is_err());
    }
}
