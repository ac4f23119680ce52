// src/domain/entity.rs
use crate::domain::errors::{DomainError, DomainResult};
use serde::Serialize;
use serde_json::Value;

/// Ordered column name -> value mapping.
pub type FieldMap = serde_json::Map<String, Value>;

/// Storage metadata for a persisted record type. `COLUMNS` is the single source
/// used for SELECT lists, DML statements and audit field maps.
pub trait Entity: Serialize + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> i64;
}

/// Capability marker for rows that belong to exactly one tenant.
pub trait MustHaveTenant: Entity {
    const TENANT_COLUMN: &'static str = "tenant_id";

    fn tenant_id(&self) -> Option<&str>;
}

/// Serialize `entity` into a map holding exactly its declared columns, in
/// declaration order.
pub fn field_map<E: Entity>(entity: &E) -> DomainResult<FieldMap> {
    let value = serde_json::to_value(entity)
        .map_err(|err| DomainError::Validation(format!("{}: {err}", E::TABLE)))?;
    let Value::Object(mut object) = value else {
        return Err(DomainError::Validation(format!(
            "{} does not serialize to an object",
            E::TABLE
        )));
    };

    Ok(E::COLUMNS
        .iter()
        .map(|column| {
            let value = object.remove(*column).unwrap_or(Value::Null);
            ((*column).to_string(), value)
        })
        .collect())
}
