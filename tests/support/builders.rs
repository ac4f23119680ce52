// tests/support/builders.rs
use tenant_audit::domain::product::Product;

pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            product: Product {
                id,
                name: "Widget".into(),
                rate: 5,
                price: 9.5,
                stock: 3.0,
                description: "blue".into(),
                tenant_id: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.product.name = name.into();
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.product.price = price;
        self
    }

    pub fn tenant(mut self, tenant: &str) -> Self {
        self.product.tenant_id = Some(tenant.into());
        self
    }

    pub fn build(self) -> Product {
        self.product
    }
}

pub fn product(id: i64) -> Product {
    ProductBuilder::new(id).build()
}
