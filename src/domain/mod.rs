pub mod audit;
pub mod entity;
pub mod errors;
pub mod product;
pub mod tenant;
