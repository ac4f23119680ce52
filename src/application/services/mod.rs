// src/application/services/mod.rs
pub mod audit;
pub mod products;

pub use audit::AuditLogService;
pub use products::ProductService;
