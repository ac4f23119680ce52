// src/infrastructure/audit/error.rs
use thiserror::Error;

/// Failure of the secondary audit write. Reported, never propagated into the
/// result of the business save.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit storage failure: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("audit flush cancelled; {dropped} record(s) dropped")]
    Cancelled { dropped: usize },
    #[error("blocking audit flush requires a tokio runtime")]
    NoRuntime,
}
