pub mod audit;
pub mod products;

pub use audit::AuditLogDto;
pub use products::{ProductDto, ProductPayload};
