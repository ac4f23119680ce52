// src/infrastructure/persistence/mod.rs
pub mod context;
pub mod error;
pub mod filter;
pub mod interceptor;
pub mod statement;
pub mod tracker;

pub use context::{ContextFactory, ScopedPersistenceContext, TenantSet};
pub use interceptor::{ContextId, SaveInterceptor, SavedEvent, SavingEvent};
pub use tracker::{ChangeTracker, EntityState, TrackedEntry};
