// src/infrastructure/audit/mod.rs
pub mod buffer;
pub mod capture;
pub mod error;
pub mod interceptor;
pub mod persistor;
pub mod writer;

pub use buffer::PendingAuditBuffer;
pub use capture::ChangeCapture;
pub use error::AuditError;
pub use interceptor::AuditInterceptor;
pub use persistor::AuditPersistor;
pub use writer::{AuditWriter, SqlAuditLogReader, SqlAuditWriter};

use crate::application::ports::time::Clock;
use std::sync::Arc;

/// Wire capture, buffer and persistor together around `writer`.
pub fn audit_interceptor(clock: Arc<dyn Clock>, writer: Arc<dyn AuditWriter>) -> AuditInterceptor {
    let buffer = Arc::new(PendingAuditBuffer::default());
    let persistor = AuditPersistor::new(Arc::clone(&buffer), writer);
    AuditInterceptor::new(ChangeCapture::new(clock), buffer, persistor)
}
