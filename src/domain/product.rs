// src/domain/product.rs
use crate::domain::entity::{Entity, MustHaveTenant};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub rate: i64,
    pub price: f64,
    pub stock: f64,
    pub description: String,
    /// Assigned by the persistence context on insert; caller values are ignored.
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl Entity for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "rate",
        "price",
        "stock",
        "description",
        "tenant_id",
    ];

    fn key(&self) -> i64 {
        self.id
    }
}

impl MustHaveTenant for Product {
    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}
