use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::types::{Column, WorkerKind};

// ---------------------------------------------------------------------------
// DiagnosticRecord
// ---------------------------------------------------------------------------

/// Human-relevant records the orchestrator emits alongside its main work:
/// "did my click register", moves that were attempted but not applied, and
/// completion payloads whose run binding was lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticRecord {
    TriggerAccepted {
        event_id: Uuid,
        worker: WorkerKind,
        at: DateTime<Utc>,
    },
    TriggerRejected {
        event_id: Uuid,
        worker: WorkerKind,
        at: DateTime<Utc>,
    },
    MoveNotApplied {
        ticket_id: String,
        from: Column,
        to: Column,
        reason: String,
    },
    VerdictMissing {
        run_id: Uuid,
        ticket_id: String,
    },
    OrphanedCompletion {
        run_id: Uuid,
        text: String,
    },
}

// ---------------------------------------------------------------------------
// DiagnosticsSink
// ---------------------------------------------------------------------------

/// Somewhere to put diagnostic records. Implementations must be cheap and
/// infallible; a record is never worth failing a run over.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, record: DiagnosticRecord);
}

/// Retains records in memory, newest last.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().expect("diagnostics lock").clone()
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, record: DiagnosticRecord) {
        self.records.lock().expect("diagnostics lock").push(record);
    }
}

/// Forwards records to the tracing subscriber.
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, record: DiagnosticRecord) {
        match &record {
            DiagnosticRecord::MoveNotApplied { ticket_id, reason, .. } => {
                tracing::warn!(%ticket_id, %reason, "move not applied");
            }
            DiagnosticRecord::OrphanedCompletion { run_id, .. } => {
                tracing::warn!(%run_id, "orphaned completion payload retained");
            }
            DiagnosticRecord::VerdictMissing { run_id, ticket_id } => {
                tracing::warn!(%run_id, %ticket_id, "verdict missing from completion report");
            }
            DiagnosticRecord::TriggerAccepted { event_id, worker, .. } => {
                tracing::info!(%event_id, %worker, "trigger accepted");
            }
            DiagnosticRecord::TriggerRejected { event_id, worker, .. } => {
                tracing::info!(%event_id, %worker, "duplicate trigger rejected");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_retains_order() {
        let sink = MemorySink::new();
        sink.record(DiagnosticRecord::MoveNotApplied {
            ticket_id: "0071".into(),
            from: Column::ToDo,
            to: Column::Doing,
            reason: "column mismatch".into(),
        });
        sink.record(DiagnosticRecord::VerdictMissing {
            run_id: Uuid::new_v4(),
            ticket_id: "0071".into(),
        });
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], DiagnosticRecord::MoveNotApplied { .. }));
        assert!(matches!(records[1], DiagnosticRecord::VerdictMissing { .. }));
    }

    #[test]
    fn record_json_tagged() {
        let record = DiagnosticRecord::TriggerAccepted {
            event_id: Uuid::new_v4(),
            worker: WorkerKind::Qa,
            at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\":\"trigger_accepted\""));
    }
}
