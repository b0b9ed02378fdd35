use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::diagnostics::{DiagnosticRecord, DiagnosticsSink};
use crate::types::AgentKind;

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// What kind of message landed in a conversation log. Terminal payloads are
/// labeled distinctly from intermediate stage events so renderers can tell a
/// completion report apart from progress chatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryKind {
    /// The user's triggering message, appended exactly once per accepted
    /// trigger.
    Trigger,
    /// An intermediate stage event from a running job.
    Stage,
    /// The terminal completion report, full verbatim text.
    CompletionReport,
    /// A terminal failure message.
    Failure,
}

impl LogEntryKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, LogEntryKind::CompletionReport | LogEntryKind::Failure)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub kind: LogEntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    pub text: String,
}

impl LogEntry {
    pub fn new(kind: LogEntryKind, run_id: Option<Uuid>, text: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind,
            run_id,
            text: text.into(),
        }
    }
}

/// A completion payload whose run binding was lost. Never dropped, never
/// guessed into an arbitrary log; retained here and surfaced through the
/// diagnostics sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphanedEvent {
    pub run_id: Uuid,
    pub entry: LogEntry,
}

// ---------------------------------------------------------------------------
// ConversationRouter
// ---------------------------------------------------------------------------

/// Owns the per-agent-kind conversation logs and the run-to-kind bindings.
///
/// A run's agent kind is bound when the job launches and held for the run's
/// whole lifetime, so events route to the right log no matter what the UI
/// is focused on by the time they arrive.
pub struct ConversationRouter {
    logs: Mutex<HashMap<AgentKind, Vec<LogEntry>>>,
    bindings: Mutex<HashMap<Uuid, AgentKind>>,
    orphans: Mutex<Vec<OrphanedEvent>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl ConversationRouter {
    pub fn new(diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
            bindings: Mutex::new(HashMap::new()),
            orphans: Mutex::new(Vec::new()),
            diagnostics,
        }
    }

    /// Append directly to a known kind's log.
    pub fn append(&self, kind: AgentKind, entry: LogEntry) {
        self.logs
            .lock()
            .expect("logs lock")
            .entry(kind)
            .or_default()
            .push(entry);
    }

    /// Bind `run_id` to `kind` for the rest of the run's lifetime.
    pub fn bind(&self, run_id: Uuid, kind: AgentKind) {
        self.bindings.lock().expect("bindings lock").insert(run_id, kind);
    }

    /// Route an event to the log its run was bound to. Terminal entries
    /// release the binding (the run is done; the log is the record).
    /// An unbound event is retained as an orphan rather than dropped.
    pub fn route(&self, run_id: Uuid, entry: LogEntry) {
        let kind = {
            let mut bindings = self.bindings.lock().expect("bindings lock");
            let kind = bindings.get(&run_id).copied();
            if entry.kind.is_terminal() && kind.is_some() {
                bindings.remove(&run_id);
            }
            kind
        };

        match kind {
            Some(kind) => self.append(kind, entry),
            None => {
                self.diagnostics.record(DiagnosticRecord::OrphanedCompletion {
                    run_id,
                    text: entry.text.clone(),
                });
                self.orphans
                    .lock()
                    .expect("orphans lock")
                    .push(OrphanedEvent { run_id, entry });
            }
        }
    }

    pub fn log(&self, kind: AgentKind) -> Vec<LogEntry> {
        self.logs
            .lock()
            .expect("logs lock")
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn orphans(&self) -> Vec<OrphanedEvent> {
        self.orphans.lock().expect("orphans lock").clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
