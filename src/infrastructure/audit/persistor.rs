// src/infrastructure/audit/persistor.rs
use crate::domain::tenant::ConnectionDescriptor;
use crate::infrastructure::audit::{buffer::PendingAuditBuffer, error::AuditError, writer::AuditWriter};
use crate::infrastructure::persistence::ContextId;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Flushes a context's pending audit records through an [`AuditWriter`].
/// The pending entry is consumed before the write is attempted, so each save
/// cycle gets at most one attempt.
#[derive(Clone)]
pub struct AuditPersistor {
    buffer: Arc<PendingAuditBuffer>,
    writer: Arc<dyn AuditWriter>,
}

impl AuditPersistor {
    pub fn new(buffer: Arc<PendingAuditBuffer>, writer: Arc<dyn AuditWriter>) -> Self {
        Self { buffer, writer }
    }

    /// Returns the number of records written; `Ok(0)` when nothing was pending.
    pub async fn flush(
        &self,
        id: ContextId,
        connection: &ConnectionDescriptor,
        cancel: &CancellationToken,
    ) -> Result<usize, AuditError> {
        let Some(records) = self.buffer.take(id) else {
            return Ok(0);
        };
        if records.is_empty() {
            return Ok(0);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuditError::Cancelled { dropped: records.len() }),
            result = self.writer.write_batch(connection, &records) => result.map(|()| records.len()),
        }
    }

    /// Same removal-then-insert sequence as [`flush`](Self::flush), driven from a
    /// blocking thread.
    pub fn flush_blocking(
        &self,
        id: ContextId,
        connection: &ConnectionDescriptor,
    ) -> Result<usize, AuditError> {
        let runtime = Handle::try_current().map_err(|_| AuditError::NoRuntime)?;
        runtime.block_on(self.flush(id, connection, &CancellationToken::new()))
    }
}
