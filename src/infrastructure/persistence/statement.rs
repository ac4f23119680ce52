// src/infrastructure/persistence/statement.rs
use serde_json::Value;
use sqlx::{
    Any,
    any::AnyArguments,
    query::Query,
};
use std::fmt::Write as _;

/// SQL text plus positional arguments. Placeholders are written as `$N`, which
/// both the Postgres and SQLite drivers accept through `sqlx::Any`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn push_bind(&mut self, value: Value) -> &mut Self {
        self.args.push(value);
        let _ = write!(self.sql, "${}", self.args.len());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        self.args
            .iter()
            .fold(sqlx::query(&self.sql), |query, value| bind_value(query, value))
    }
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => query.bind(int),
            None => query.bind(number.as_f64()),
        },
        Value::String(text) => query.bind(text.clone()),
        nested @ (Value::Array(_) | Value::Object(_)) => query.bind(nested.to_string()),
    }
}
