use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::WorkerKind;
use crate::verdict::ParsedVerdict;

// ---------------------------------------------------------------------------
// RunStage
// ---------------------------------------------------------------------------

/// Lifecycle of a run, forward-only, with two terminal stages.
///
/// `Preparing → FetchingTicket → ResolvingTarget → Launching → Polling →
/// Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Preparing,
    FetchingTicket,
    ResolvingTarget,
    Launching,
    Polling,
    Completed,
    Failed,
}

impl RunStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStage::Preparing => "preparing",
            RunStage::FetchingTicket => "fetching_ticket",
            RunStage::ResolvingTarget => "resolving_target",
            RunStage::Launching => "launching",
            RunStage::Polling => "polling",
            RunStage::Completed => "completed",
            RunStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStage::Completed | RunStage::Failed)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Pass,
    Fail,
    Error,
    Cancelled,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunOutcome::Pass => "pass",
            RunOutcome::Fail => "fail",
            RunOutcome::Error => "error",
            RunOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// AgentRun
// ---------------------------------------------------------------------------

/// One attempt to execute a work agent against one ticket. Lives only for
/// the duration of the orchestration; once the terminal event has been
/// routed, the conversation log is the record and the run is dropped.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub id: Uuid,
    pub worker: WorkerKind,
    /// Resolved during `Preparing`; empty until then.
    pub ticket_id: String,
    pub stage: RunStage,
    pub started_at: DateTime<Utc>,
    /// Terminal outcome; `None` while in flight, and `None` on a completed
    /// run whose report carried no verdict.
    pub outcome: Option<RunOutcome>,
    /// Raw completion report, verbatim, once terminal.
    pub report: Option<String>,
    pub verdict: Option<ParsedVerdict>,
}

impl AgentRun {
    pub fn new(worker: WorkerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            worker,
            ticket_id: String::new(),
            stage: RunStage::Preparing,
            started_at: Utc::now(),
            outcome: None,
            report: None,
            verdict: None,
        }
    }

    /// Advance to `stage`. Stages only move forward; a terminal stage is
    /// never left.
    pub fn advance(&mut self, stage: RunStage) {
        debug_assert!(
            stage >= self.stage && !self.stage.is_terminal(),
            "illegal stage transition {} -> {}",
            self.stage,
            stage
        );
        self.stage = stage;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
