use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::product::Product;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub rate: i64,
    pub price: f64,
    pub stock: f64,
    pub description: String,
    pub tenant_id: Option<String>,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            rate: product.rate,
            price: product.price,
            stock: product.stock,
            description: product.description,
            tenant_id: product.tenant_id,
        }
    }
}

/// Body of create and update requests. `id` is optional on create; a
/// `tenant_id` is accepted but always replaced by the caller's tenant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPayload {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub rate: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl ProductPayload {
    pub fn into_product(self, id: i64) -> ApplicationResult<Product> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApplicationError::validation("product name must not be empty"));
        }
        if !self.price.is_finite() || !self.stock.is_finite() {
            return Err(ApplicationError::validation("price and stock must be finite numbers"));
        }
        Ok(Product {
            id,
            name: name.to_string(),
            rate: self.rate,
            price: self.price,
            stock: self.stock,
            description: self.description,
            tenant_id: self.tenant_id,
        })
    }
}
