//! Fire-and-forget audit emission.
//!
//! The [`AuditEmitter`] accepts [`SecurityEvent`]s from every decision point
//! in the core and forwards them to an append-only [`AuditSink`] on a
//! background task. Emission never blocks and never gates the success of the
//! primary operation: if the sink is slow or failing, events queue or drop
//! with a logged warning, but requests keep being served.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::event::{SecurityEvent, Severity};
use crate::error::StoreResult;

/// Append-only store for security events.
///
/// Implementations must be write-once: events are never updated or deleted.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends an event to the sink.
    async fn append(&self, event: SecurityEvent) -> StoreResult<()>;
}

/// In-memory audit sink.
///
/// Primarily for tests and development; production deployments configure a
/// durable sink.
#[derive(Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, event: SecurityEvent) -> StoreResult<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Fire-and-forget emitter for security events.
///
/// Cloning an emitter is cheap; all clones feed the same background writer.
/// Dropping the last clone closes the channel and lets the writer task drain
/// and exit.
#[derive(Clone)]
pub struct AuditEmitter {
    tx: mpsc::UnboundedSender<SecurityEvent>,
}

impl AuditEmitter {
    /// Creates an emitter writing to the given sink.
    ///
    /// Spawns the background writer task on the current tokio runtime.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SecurityEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.append(event).await {
                    // The primary operation already succeeded; all we can do
                    // is surface the sink failure loudly.
                    error!(error = %e, "failed to append security event to audit sink");
                }
            }
            debug!("audit writer task exiting");
        });

        Self { tx }
    }

    /// Emits a security event without waiting for it to be persisted.
    pub fn emit(&self, event: SecurityEvent) {
        match event.severity {
            Severity::Critical | Severity::High => {
                warn!(
                    action = event.action.as_str(),
                    outcome = ?event.outcome,
                    severity = ?event.severity,
                    correlation_id = event.correlation_id.as_deref().unwrap_or(""),
                    "security event"
                );
            }
            Severity::Warning | Severity::Info => {
                info!(
                    action = event.action.as_str(),
                    outcome = ?event.outcome,
                    "security event"
                );
            }
            Severity::Debug => {
                debug!(action = event.action.as_str(), "security event");
            }
        }

        if self.tx.send(event).is_err() {
            // Writer task is gone; nothing to gate on.
            warn!("audit channel closed, event dropped");
        }
    }
}

impl std::fmt::Debug for AuditEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::event::{AuditAction, AuditOutcome};

    #[tokio::test]
    async fn test_emit_reaches_sink() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let emitter = AuditEmitter::new(sink.clone());

        emitter.emit(SecurityEvent::new(
            AuditAction::EntitlementDenied,
            AuditOutcome::Denied,
            Severity::Warning,
        ));

        // Give the background writer a turn.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::EntitlementDenied);
    }

    #[tokio::test]
    async fn test_emit_never_blocks_on_many_events() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let emitter = AuditEmitter::new(sink.clone());

        for _ in 0..1000 {
            emitter.emit(SecurityEvent::new(
                AuditAction::ScopedRead,
                AuditOutcome::Granted,
                Severity::Debug,
            ));
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(sink.len(), 1000);
    }

    #[tokio::test]
    async fn test_clone_feeds_same_sink() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let emitter = AuditEmitter::new(sink.clone());
        let clone = emitter.clone();

        clone.emit(SecurityEvent::new(
            AuditAction::RawQuery,
            AuditOutcome::Granted,
            Severity::Info,
        ));

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(sink.len(), 1);
    }
}
