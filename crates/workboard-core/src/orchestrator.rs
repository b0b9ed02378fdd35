use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use agent_client::{JobRunner, JobSpec, JobStatus};

use crate::board::{Board, MoveKind, MoveOutcome};
use crate::config::OrchestratorConfig;
use crate::diagnostics::{DiagnosticRecord, DiagnosticsSink};
use crate::error::BoardError;
use crate::router::{ConversationRouter, LogEntry, LogEntryKind};
use crate::run::{AgentRun, RunOutcome, RunStage};
use crate::store::TicketStore;
use crate::ticket;
use crate::trigger::{AcceptedTrigger, TriggerDeduplicator, TriggerSignature};
use crate::types::{Column, WorkerKind};
use crate::verdict::{self, Verdict};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What became of one delivered trigger.
#[derive(Debug)]
pub enum Dispatch {
    /// A duplicate delivery of an already-accepted trigger; nothing was
    /// appended and no run was started. Carries the original event id.
    Rejected { event_id: Uuid },
    /// The trigger was accepted and its run was driven to a terminal stage.
    Completed(AgentRun),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Composes the board, the job runner, the deduplicator, and the router.
///
/// `handle_trigger` is the single authoritative dispatch point: it accepts
/// the trigger, appends the one trigger message, and drives the one run.
/// No other call site appends trigger messages or starts runs, which is
/// what keeps "one click, one message, one run" true under duplicate
/// delivery from embedded UI surfaces.
pub struct Orchestrator {
    board: Board,
    runner: Arc<dyn JobRunner>,
    router: Arc<ConversationRouter>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    dedup: Mutex<TriggerDeduplicator>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TicketStore>,
        runner: Arc<dyn JobRunner>,
        router: Arc<ConversationRouter>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        config: OrchestratorConfig,
    ) -> Self {
        let dedup = Mutex::new(TriggerDeduplicator::new(config.trigger_window_ms as i64));
        Self {
            board: Board::new(store, diagnostics.clone()),
            runner,
            router,
            diagnostics,
            dedup,
            config,
        }
    }

    pub fn router(&self) -> &Arc<ConversationRouter> {
        &self.router
    }

    /// The most recently accepted trigger, for diagnostics.
    pub fn last_accepted(&self) -> Option<AcceptedTrigger> {
        self.dedup.lock().expect("dedup lock").last_accepted().cloned()
    }

    /// Accept (or reject) a trigger and, when accepted, drive its run to a
    /// terminal stage. Runs for different tickets may be driven
    /// concurrently; callers typically spawn this per trigger.
    pub async fn handle_trigger(&self, worker: WorkerKind, content: &str) -> Dispatch {
        let signature = TriggerSignature::new(worker, content);
        let acceptance = self.dedup.lock().expect("dedup lock").accept(&signature);

        if !acceptance.accepted {
            self.diagnostics.record(DiagnosticRecord::TriggerRejected {
                event_id: acceptance.event_id,
                worker,
                at: chrono::Utc::now(),
            });
            return Dispatch::Rejected {
                event_id: acceptance.event_id,
            };
        }

        self.diagnostics.record(DiagnosticRecord::TriggerAccepted {
            event_id: acceptance.event_id,
            worker,
            at: chrono::Utc::now(),
        });

        // The one appended trigger message for this click.
        self.router.append(
            worker.channel(),
            LogEntry::new(LogEntryKind::Trigger, None, content),
        );

        let mut run = AgentRun::new(worker);
        tracing::info!(run_id = %run.id, %worker, "run starting");
        self.execute(&mut run, content).await;
        tracing::info!(run_id = %run.id, stage = %run.stage, "run finished");
        Dispatch::Completed(run)
    }

    // -----------------------------------------------------------------------
    // Run state machine
    // -----------------------------------------------------------------------

    async fn execute(&self, run: &mut AgentRun, content: &str) {
        let channel = run.worker.channel();

        // Preparing: resolve the target ticket out of the trigger content.
        self.emit_direct(run, format!("preparing {} run", run.worker));
        let Some(ticket_id) = ticket::parse_ticket_ref(content) else {
            self.fail_direct(
                run,
                RunOutcome::Error,
                BoardError::InvalidTrigger(format!("no ticket reference in '{content}'"))
                    .to_string(),
            );
            return;
        };
        run.ticket_id = ticket_id.clone();

        // FetchingTicket
        run.advance(RunStage::FetchingTicket);
        self.emit_direct(run, format!("fetching ticket {ticket_id}"));
        if let Err(e) = self.board.ticket(&ticket_id).await {
            let message = match e {
                BoardError::TicketNotFound(_) => format!("ticket {ticket_id} not found"),
                other => format!("could not load ticket {ticket_id}: {other}"),
            };
            self.fail_direct(run, RunOutcome::Error, message);
            return;
        }

        // ResolvingTarget: pre-run move into Doing. A ticket already past
        // its expected source column is a deliberate no-op, never a
        // backward correction.
        run.advance(RunStage::ResolvingTarget);
        let source = run.worker.expected_source();
        self.emit_direct(run, format!("moving ticket {ticket_id} {source} -> doing"));
        match self
            .board
            .attempt_move(&ticket_id, source, Column::Doing, MoveKind::Forward)
            .await
        {
            Ok(MoveOutcome::Applied { .. }) | Ok(MoveOutcome::Skipped { .. }) => {}
            Err(e) => {
                self.fail_direct(
                    run,
                    RunOutcome::Error,
                    format!("could not move ticket {ticket_id}: {e}"),
                );
                return;
            }
        }

        // Launching
        run.advance(RunStage::Launching);
        let spec = JobSpec {
            ticket_id: ticket_id.clone(),
            worker: run.worker.as_str().to_string(),
            instructions: content.to_string(),
        };
        let handle = match self.runner.launch(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                // The adapter's message is the diagnostic; pass it through
                // untouched. Configuration problems don't self-heal, so
                // there is no retry.
                self.fail_direct(run, RunOutcome::Error, e.to_string());
                return;
            }
        };

        // The agent kind is bound here and held for the run's lifetime,
        // independent of whatever the UI focuses on later.
        self.router.bind(run.id, channel);
        self.router.route(
            run.id,
            stage_entry(run, format!("launched job {} for ticket {ticket_id}", handle.job_id)),
        );

        // Polling
        run.advance(RunStage::Polling);
        let deadline =
            Instant::now() + Duration::from_secs(self.config.run_timeout_minutes * 60);
        let interval = Duration::from_secs(self.config.poll_interval_seconds);
        let mut failures = 0u32;

        let final_text = loop {
            if Instant::now() >= deadline {
                let timeout = BoardError::Timeout(self.config.run_timeout_minutes * 60);
                self.fail_routed(
                    run,
                    RunOutcome::Error,
                    format!("{timeout}; the external job may still be running, but this run is over"),
                );
                return;
            }

            sleep(interval).await;

            match self.runner.poll(&handle).await {
                Ok(JobStatus::Running { partial_text }) => {
                    failures = 0;
                    let text = partial_text.unwrap_or_else(|| "job running".to_string());
                    self.router.route(run.id, stage_entry(run, text));
                }
                Ok(JobStatus::Finished { final_text }) => break final_text,
                Ok(JobStatus::Failed { message }) => {
                    self.fail_routed(run, RunOutcome::Error, format!("job failed: {message}"));
                    return;
                }
                Ok(JobStatus::Cancelled) => {
                    self.fail_routed(run, RunOutcome::Cancelled, "job was cancelled".to_string());
                    return;
                }
                Ok(JobStatus::Errored { message }) => {
                    self.fail_routed(run, RunOutcome::Error, format!("job errored: {message}"));
                    return;
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(run_id = %run.id, attempt = failures, error = %e, "poll failed");
                    if failures > self.config.poll_retry_limit {
                        let exhausted = BoardError::PollExhausted {
                            attempts: failures,
                            last: e.to_string(),
                        };
                        self.fail_routed(run, RunOutcome::Error, exhausted.to_string());
                        return;
                    }
                }
            }
        };

        // Completed: interpret the report, apply the post-run move, and
        // deliver the terminal event with the full verbatim text.
        run.advance(RunStage::Completed);
        run.report = Some(final_text.clone());
        let parsed = verdict::parse(&final_text);
        run.verdict = Some(parsed.clone());

        let mut notes: Vec<String> = Vec::new();
        match (run.worker, parsed.verdict) {
            (WorkerKind::Qa, Verdict::Pass) => {
                run.outcome = Some(RunOutcome::Pass);
                self.post_move(run, &ticket_id, Column::HumanInLoop, MoveKind::Forward, &mut notes)
                    .await;
            }
            (WorkerKind::Qa, Verdict::Fail) => {
                run.outcome = Some(RunOutcome::Fail);
                self.post_move(run, &ticket_id, Column::ToDo, MoveKind::QaFail, &mut notes)
                    .await;
            }
            // Implementation runs make no auto-move beyond ResolvingTarget.
            (WorkerKind::Implementation, Verdict::Pass) => {
                run.outcome = Some(RunOutcome::Pass);
            }
            (WorkerKind::Implementation, Verdict::Fail) => {
                run.outcome = Some(RunOutcome::Fail);
            }
            (_, Verdict::Unknown) => {
                self.diagnostics.record(DiagnosticRecord::VerdictMissing {
                    run_id: run.id,
                    ticket_id: ticket_id.clone(),
                });
                notes.push(
                    "note: verdict missing from completion report; no column move applied"
                        .to_string(),
                );
            }
        }

        let mut text = final_text;
        if !notes.is_empty() {
            text.push_str("\n\n");
            text.push_str(&notes.join("\n"));
        }
        self.router
            .route(run.id, LogEntry::new(LogEntryKind::CompletionReport, Some(run.id), text));
    }

    /// Post-run move. The outcome depends only on the ticket's current
    /// column at this moment; a skip (e.g. the user dragged the card away
    /// mid-run) is noted, not forced. A store failure here is noted too —
    /// the report itself must still reach the log.
    async fn post_move(
        &self,
        run: &AgentRun,
        ticket_id: &str,
        to: Column,
        kind: MoveKind,
        notes: &mut Vec<String>,
    ) {
        match self
            .board
            .attempt_move(ticket_id, Column::Doing, to, kind)
            .await
        {
            Ok(MoveOutcome::Applied { position, .. }) => {
                notes.push(format!("ticket {ticket_id} moved to {to} (position {position})"));
            }
            Ok(MoveOutcome::Skipped { reason }) => {
                notes.push(format!("ticket {ticket_id} not moved: {reason}"));
            }
            Err(e) => {
                tracing::error!(run_id = %run.id, ticket_id, error = %e, "post-run move failed");
                notes.push(format!("ticket {ticket_id} move failed: {e}"));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Event emission
    // -----------------------------------------------------------------------

    /// Stage event before the run is bound (pre-launch stages): the worker
    /// kind is still known synchronously, append straight to its log.
    fn emit_direct(&self, run: &AgentRun, text: String) {
        self.router.append(run.worker.channel(), stage_entry(run, text));
    }

    fn fail_direct(&self, run: &mut AgentRun, outcome: RunOutcome, message: String) {
        run.advance(RunStage::Failed);
        run.outcome = Some(outcome);
        tracing::warn!(run_id = %run.id, %message, "run failed");
        self.router.append(
            run.worker.channel(),
            LogEntry::new(LogEntryKind::Failure, Some(run.id), message),
        );
    }

    /// Terminal failure after binding: routed, which also releases the
    /// binding.
    fn fail_routed(&self, run: &mut AgentRun, outcome: RunOutcome, message: String) {
        run.advance(RunStage::Failed);
        run.outcome = Some(outcome);
        tracing::warn!(run_id = %run.id, %message, "run failed");
        self.router
            .route(run.id, LogEntry::new(LogEntryKind::Failure, Some(run.id), message));
    }
}

fn stage_entry(run: &AgentRun, text: String) -> LogEntry {
    LogEntry::new(LogEntryKind::Stage, Some(run.id), text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
