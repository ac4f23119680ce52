// src/infrastructure/mod.rs
pub mod audit;
pub mod database;
pub mod persistence;
pub mod tenancy;
pub mod time;
