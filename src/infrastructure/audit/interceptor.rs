// src/infrastructure/audit/interceptor.rs
use crate::infrastructure::audit::{
    buffer::PendingAuditBuffer, capture::ChangeCapture, error::AuditError,
    persistor::AuditPersistor,
};
use crate::infrastructure::persistence::{ContextId, SaveInterceptor, SavedEvent, SavingEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Save interceptor that captures audit records before the commit and writes
/// them on a separate connection after it. Shared by every context.
pub struct AuditInterceptor {
    capture: ChangeCapture,
    buffer: Arc<PendingAuditBuffer>,
    persistor: AuditPersistor,
}

impl AuditInterceptor {
    pub fn new(capture: ChangeCapture, buffer: Arc<PendingAuditBuffer>, persistor: AuditPersistor) -> Self {
        Self {
            capture,
            buffer,
            persistor,
        }
    }

    pub fn buffer(&self) -> &Arc<PendingAuditBuffer> {
        &self.buffer
    }
}

#[async_trait]
impl SaveInterceptor for AuditInterceptor {
    fn saving_changes(&self, event: &SavingEvent<'_>) {
        let records = self.capture.capture(event);
        if records.is_empty() {
            // A previous cycle on this context may have failed to commit; its
            // capture describes nothing that reached storage.
            if self.buffer.take(event.context_id).is_some() {
                tracing::debug!(context = %event.context_id, "discarded stale audit capture");
            }
            return;
        }
        tracing::debug!(context = %event.context_id, records = records.len(), "captured audit records");
        self.buffer.replace(event.context_id, records);
    }

    fn saved_changes(&self, event: &SavedEvent<'_>) {
        report(
            event.context_id,
            self.persistor.flush_blocking(event.context_id, event.connection),
        );
    }

    async fn saved_changes_async(&self, event: &SavedEvent<'_>, cancel: &CancellationToken) {
        report(
            event.context_id,
            self.persistor
                .flush(event.context_id, event.connection, cancel)
                .await,
        );
    }

    fn context_disposed(&self, context_id: ContextId) {
        // Left behind by a commit that failed or was cancelled.
        if let Some(records) = self.buffer.take(context_id) {
            tracing::debug!(
                context = %context_id,
                records = records.len(),
                "discarded audit capture of a disposed context"
            );
        }
    }
}

fn report(context: ContextId, result: Result<usize, AuditError>) {
    match result {
        Ok(0) => {}
        Ok(written) => tracing::debug!(%context, written, "audit records persisted"),
        Err(err) => tracing::error!(
            %context,
            error = %err,
            "audit persistence failed; business save is unaffected"
        ),
    }
}
