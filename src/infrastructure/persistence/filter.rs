// src/infrastructure/persistence/filter.rs
use crate::domain::tenant::TenantScope;
use crate::infrastructure::persistence::statement::Statement;
use serde_json::Value;

/// Builds every statement that touches a tenant-owned table. Reads, updates and
/// deletes all go through here, so the tenant predicate cannot be skipped.
#[derive(Debug, Clone)]
pub struct TenantFilter {
    scope: TenantScope,
}

impl TenantFilter {
    pub fn new(scope: TenantScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &TenantScope {
        &self.scope
    }

    /// Append ` AND <tenant predicate>`. An unresolved scope yields a predicate
    /// that matches nothing.
    pub fn push_predicate(&self, stmt: &mut Statement, tenant_column: &str) {
        match &self.scope {
            TenantScope::Tenant(id) => {
                stmt.push(" AND ")
                    .push(tenant_column)
                    .push(" = ")
                    .push_bind(Value::String(id.as_str().to_string()));
            }
            TenantScope::Unresolved => {
                stmt.push(" AND 1 = 0");
            }
        }
    }

    pub fn select_all(&self, table: &str, columns: &[&str], key: &str, tenant_column: &str) -> Statement {
        let mut stmt = Statement::new(format!(
            "SELECT {} FROM {table} WHERE 1 = 1",
            columns.join(", ")
        ));
        self.push_predicate(&mut stmt, tenant_column);
        stmt.push(" ORDER BY ").push(key);
        stmt
    }

    pub fn select_by_key(
        &self,
        table: &str,
        columns: &[&str],
        key: &str,
        tenant_column: &str,
        id: i64,
    ) -> Statement {
        let mut stmt = Statement::new(format!(
            "SELECT {} FROM {table} WHERE {key} = ",
            columns.join(", ")
        ));
        stmt.push_bind(Value::from(id));
        self.push_predicate(&mut stmt, tenant_column);
        stmt
    }

    pub fn next_key(&self, table: &str, key: &str, tenant_column: &str) -> Statement {
        let mut stmt = Statement::new(format!(
            "SELECT COALESCE(MAX({key}), 0) + 1 FROM {table} WHERE 1 = 1"
        ));
        self.push_predicate(&mut stmt, tenant_column);
        stmt
    }

    /// `None` when no column changed.
    pub fn update<'a, 'v>(
        &self,
        table: &str,
        key: &str,
        tenant_column: &str,
        id: i64,
        changes: impl IntoIterator<Item = (&'a str, &'v Value)>,
    ) -> Option<Statement> {
        let mut stmt = Statement::new(format!("UPDATE {table} SET "));
        let mut any = false;
        for (column, value) in changes {
            if any {
                stmt.push(", ");
            }
            stmt.push(column).push(" = ").push_bind(value.clone());
            any = true;
        }
        if !any {
            return None;
        }
        stmt.push(" WHERE ").push(key).push(" = ").push_bind(Value::from(id));
        self.push_predicate(&mut stmt, tenant_column);
        Some(stmt)
    }

    pub fn delete(&self, table: &str, key: &str, tenant_column: &str, id: i64) -> Statement {
        let mut stmt = Statement::new(format!("DELETE FROM {table} WHERE {key} = "));
        stmt.push_bind(Value::from(id));
        self.push_predicate(&mut stmt, tenant_column);
        stmt
    }
}

/// Inserts carry the tenant as a stamped column value rather than a predicate.
pub fn insert<'a, 'v>(
    table: &str,
    values: impl IntoIterator<Item = (&'a str, &'v Value)>,
) -> Statement {
    let (columns, values): (Vec<&str>, Vec<&Value>) = values.into_iter().unzip();
    let mut stmt = Statement::new(format!("INSERT INTO {table} ({}) VALUES (", columns.join(", ")));
    for (idx, value) in values.into_iter().enumerate() {
        if idx > 0 {
            stmt.push(", ");
        }
        stmt.push_bind(value.clone());
    }
    stmt.push(")");
    stmt
}
