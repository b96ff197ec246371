//! # Audit Recorder
//!
//! Fire-and-forget audit trail, written off the request path.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  service ── commit ──► sink.record(entry) ──try_send──► mpsc (bounded) │
//! │                              │                              │          │
//! │                        full / closed                        ▼          │
//! │                        warn! + drop              writer task: append   │
//! │                                                  failure: warn! + drop │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `record` is synchronous and infallible. A sale is already committed by
//! the time it is called, so nothing here can change its outcome.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rxpos_db::{AuditLogRepository, Database, NewAuditEntry};

/// Receiver of audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: NewAuditEntry);
}

/// Discards every entry.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _entry: NewAuditEntry) {}
}

/// Queues entries for a background writer.
#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<NewAuditEntry>,
}

impl AuditRecorder {
    /// Creates a recorder and the receiving end of its queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NewAuditEntry>) {
        let (tx, rx) = mpsc::channel(capacity);
        (AuditRecorder { tx }, rx)
    }

    /// Creates a recorder with its writer already running.
    ///
    /// The writer exits once every clone of the recorder is dropped and the
    /// queue is drained.
    pub fn spawn(db: Database, capacity: usize) -> (Arc<Self>, JoinHandle<()>) {
        let (recorder, rx) = Self::new(capacity);
        let handle = tokio::spawn(run_writer(db, rx));
        (Arc::new(recorder), handle)
    }
}

impl AuditSink for AuditRecorder {
    fn record(&self, entry: NewAuditEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            let (reason, entry) = match e {
                mpsc::error::TrySendError::Full(entry) => ("queue full", entry),
                mpsc::error::TrySendError::Closed(entry) => ("writer stopped", entry),
            };
            warn!(
                reason,
                action = %entry.action,
                module = %entry.module,
                "Audit entry dropped"
            );
        }
    }
}

/// Drains the queue into `audit_logs`.
pub async fn run_writer(db: Database, mut rx: mpsc::Receiver<NewAuditEntry>) {
    info!("Audit writer started");

    while let Some(entry) = rx.recv().await {
        let result = match db.acquire().await {
            Ok(mut conn) => AuditLogRepository::new(&mut conn).append(&entry).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(id) => debug!(audit_id = id, action = %entry.action, "Audit entry written"),
            Err(e) => warn!(
                error = %e,
                action = %entry.action,
                module = %entry.module,
                "Failed to write audit entry"
            ),
        }
    }

    info!("Audit writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxpos_db::DbConfig;

    fn entry(action: &str) -> NewAuditEntry {
        NewAuditEntry::new(Some(1), action, "sales", "test entry")
    }

    #[tokio::test]
    async fn test_writer_persists_entries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (recorder, handle) = AuditRecorder::spawn(db.clone(), 8);

        recorder.record(entry("checkout"));
        recorder.record(entry("dispense"));
        drop(recorder);
        handle.await.unwrap();

        let mut uow = db.begin().await.unwrap();
        assert_eq!(uow.audit_log().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (recorder, mut rx) = AuditRecorder::new(1);

        recorder.record(entry("first"));
        recorder.record(entry("second"));

        assert_eq!(rx.recv().await.unwrap().action, "first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_is_ignored() {
        let (recorder, rx) = AuditRecorder::new(4);
        drop(rx);
        recorder.record(entry("orphan"));
    }

    #[tokio::test]
    async fn test_write_failure_does_not_stop_writer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        let (recorder, rx) = AuditRecorder::new(4);
        let handle = tokio::spawn(run_writer(db, rx));

        recorder.record(entry("lost"));
        recorder.record(entry("also lost"));
        drop(recorder);

        handle.await.unwrap();
    }
}
