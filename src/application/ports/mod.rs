// src/application/ports/mod.rs
pub mod actor;
pub mod tenant;
pub mod time;
