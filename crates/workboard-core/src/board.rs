use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::diagnostics::{DiagnosticRecord, DiagnosticsSink};
use crate::error::Result;
use crate::store::TicketStore;
use crate::ticket::Ticket;
use crate::types::Column;

// ---------------------------------------------------------------------------
// MoveKind / MoveOutcome
// ---------------------------------------------------------------------------

/// How a move is allowed to travel through the pipeline.
///
/// `Forward` is the generic rule: destination strictly after the source.
/// `QaFail` is the single gated exception, permitting `Doing → ToDo` when a
/// QA run fails. Any future backward transition must revisit the forward-only
/// rule itself rather than adding another kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Forward,
    QaFail,
}

/// The result of an attempted move. A `Skipped` move is a no-op: the
/// ticket's prior column, position, and `moved_at` are untouched. Store
/// failures surface as `Err`, and the prior state stays authoritative —
/// callers must never assume the move landed.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Applied {
        position: u32,
        moved_at: DateTime<Utc>,
    },
    Skipped {
        reason: String,
    },
}

impl MoveOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, MoveOutcome::Applied { .. })
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The column state machine. All ticket column/position writes go through
/// `attempt_move`; moves for the same ticket serialize on a per-ticket lock
/// and re-read the current column immediately before writing, so a
/// concurrent manual drag loses cleanly (skip) instead of being overwritten.
pub struct Board {
    store: Arc<dyn TicketStore>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    ticket_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Board {
    pub fn new(store: Arc<dyn TicketStore>, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            store,
            diagnostics,
            ticket_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn ticket(&self, id: &str) -> Result<Ticket> {
        self.store.get(id).await
    }

    /// Move `ticket_id` from `from` to `to`, appending it to the end of the
    /// destination column (position = max + 1, 1 when empty).
    ///
    /// The move applies only if the ticket's current column equals `from` at
    /// the moment of the write; any mismatch is a deliberate no-op reported
    /// as `Skipped`, never a forced correction.
    pub async fn attempt_move(
        &self,
        ticket_id: &str,
        from: Column,
        to: Column,
        kind: MoveKind,
    ) -> Result<MoveOutcome> {
        let lock = self.lock_for(ticket_id);
        let _guard = lock.lock().await;

        // Re-read under the lock: the constraint is checked against the
        // store's current view, not whatever the caller last saw.
        let mut ticket = self.store.get(ticket_id).await?;

        if ticket.column != from {
            return Ok(self.skip(
                ticket_id,
                from,
                to,
                format!(
                    "ticket is in '{}', expected '{}'",
                    ticket.column, from
                ),
            ));
        }

        match kind {
            MoveKind::Forward => {
                if to.index() <= from.index() {
                    return Ok(self.skip(
                        ticket_id,
                        from,
                        to,
                        format!("not a forward move: {from} -> {to}"),
                    ));
                }
            }
            MoveKind::QaFail => {
                if from != Column::Doing || to != Column::ToDo {
                    return Ok(self.skip(
                        ticket_id,
                        from,
                        to,
                        "qa-fail move is only doing -> to_do".to_string(),
                    ));
                }
            }
        }

        let position = self.store.max_position(to).await? + 1;
        let moved_at = Utc::now();

        ticket.column = to;
        ticket.position = position;
        ticket.moved_at = moved_at;
        ticket.rewrite_status_header(to);

        // A failed write propagates as Err; nothing was applied.
        self.store.put(&ticket).await?;

        tracing::debug!(ticket_id, %from, %to, position, "move applied");
        Ok(MoveOutcome::Applied { position, moved_at })
    }

    fn skip(&self, ticket_id: &str, from: Column, to: Column, reason: String) -> MoveOutcome {
        self.diagnostics.record(DiagnosticRecord::MoveNotApplied {
            ticket_id: ticket_id.to_string(),
            from,
            to,
            reason: reason.clone(),
        });
        tracing::debug!(ticket_id, %from, %to, %reason, "move skipped");
        MoveOutcome::Skipped { reason }
    }

    fn lock_for(&self, ticket_id: &str) -> Arc<AsyncMutex<()>> {
        self.ticket_locks
            .lock()
            .expect("ticket lock map")
            .entry(ticket_id.to_string())
            .or_default()
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::store::MemoryStore;

    fn board_with(store: Arc<MemoryStore>) -> (Board, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (Board::new(store, sink.clone()), sink)
    }

    async fn seed(store: &MemoryStore, id: &str, column: Column, position: u32) {
        let mut ticket = Ticket::new(id, format!("# Ticket {id}\n\n**Status:** x\n"));
        ticket.column = column;
        ticket.position = position;
        store.put(&ticket).await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_constraint_is_noop() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0071", Column::Qa, 1).await;
        let (board, sink) = board_with(store.clone());

        let before = store.get("0071").await.unwrap();
        let outcome = board
            .attempt_move("0071", Column::ToDo, Column::Doing, MoveKind::Forward)
            .await
            .unwrap();

        assert!(!outcome.applied());
        let after = store.get("0071").await.unwrap();
        assert_eq!(after.column, before.column);
        assert_eq!(after.position, before.position);
        assert_eq!(after.moved_at, before.moved_at);
        assert!(matches!(
            sink.records()[0],
            DiagnosticRecord::MoveNotApplied { .. }
        ));
    }

    #[tokio::test]
    async fn positions_append_one_through_n() {
        let store = Arc::new(MemoryStore::new());
        let (board, _) = board_with(store.clone());

        for i in 1..=5u32 {
            let id = format!("000{i}");
            seed(&store, &id, Column::ToDo, i).await;
            let outcome = board
                .attempt_move(&id, Column::ToDo, Column::Doing, MoveKind::Forward)
                .await
                .unwrap();
            match outcome {
                MoveOutcome::Applied { position, .. } => assert_eq!(position, i),
                other => panic!("expected Applied, got {other:?}"),
            }
        }

        let mut positions: Vec<u32> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.column == Column::Doing)
            .map(|t| t.position)
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn empty_destination_starts_at_one() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0071", Column::ToDo, 3).await;
        let (board, _) = board_with(store.clone());

        let outcome = board
            .attempt_move("0071", Column::ToDo, Column::Doing, MoveKind::Forward)
            .await
            .unwrap();
        match outcome {
            MoveOutcome::Applied { position, .. } => assert_eq!(position, 1),
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_move_from_unassigned() {
        let store = Arc::new(MemoryStore::new());
        // Ticket created externally: column defaults to Unassigned
        store.put(&Ticket::new("0042", "fresh")).await.unwrap();
        let (board, _) = board_with(store.clone());

        let outcome = board
            .attempt_move("0042", Column::Unassigned, Column::ToDo, MoveKind::Forward)
            .await
            .unwrap();
        assert!(outcome.applied());
        assert_eq!(store.get("0042").await.unwrap().column, Column::ToDo);
    }

    #[tokio::test]
    async fn backward_move_skipped_under_forward_rule() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0071", Column::Qa, 1).await;
        let (board, _) = board_with(store.clone());

        let outcome = board
            .attempt_move("0071", Column::Qa, Column::ToDo, MoveKind::Forward)
            .await
            .unwrap();
        assert!(!outcome.applied());
        assert_eq!(store.get("0071").await.unwrap().column, Column::Qa);
    }

    #[tokio::test]
    async fn qa_fail_permits_doing_to_todo() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0099", Column::Doing, 1).await;
        let (board, _) = board_with(store.clone());

        let outcome = board
            .attempt_move("0099", Column::Doing, Column::ToDo, MoveKind::QaFail)
            .await
            .unwrap();
        assert!(outcome.applied());
        assert_eq!(store.get("0099").await.unwrap().column, Column::ToDo);
    }

    #[tokio::test]
    async fn qa_fail_rejects_other_routes() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0099", Column::Qa, 1).await;
        let (board, _) = board_with(store.clone());

        let outcome = board
            .attempt_move("0099", Column::Qa, Column::ToDo, MoveKind::QaFail)
            .await
            .unwrap();
        assert!(!outcome.applied());
    }

    #[tokio::test]
    async fn moved_at_and_status_header_updated() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0071", Column::ToDo, 1).await;
        let before = store.get("0071").await.unwrap();
        let (board, _) = board_with(store.clone());

        board
            .attempt_move("0071", Column::ToDo, Column::Doing, MoveKind::Forward)
            .await
            .unwrap();

        let after = store.get("0071").await.unwrap();
        assert!(after.moved_at >= before.moved_at);
        assert!(after.body.contains("**Status:** Doing"));
    }

    #[tokio::test]
    async fn store_write_failure_leaves_prior_state() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0071", Column::ToDo, 1).await;
        let (board, _) = board_with(store.clone());

        store.fail_writes(true);
        let result = board
            .attempt_move("0071", Column::ToDo, Column::Doing, MoveKind::Forward)
            .await;
        assert!(result.is_err());

        store.fail_writes(false);
        let after = store.get("0071").await.unwrap();
        assert_eq!(after.column, Column::ToDo);
        assert_eq!(after.position, 1);
    }

    #[tokio::test]
    async fn second_identical_move_skips() {
        // Simulates the lost-update race: once one writer lands, the other's
        // from-constraint no longer matches the re-read column.
        let store = Arc::new(MemoryStore::new());
        seed(&store, "0071", Column::ToDo, 1).await;
        let (board, _) = board_with(store.clone());

        let first = board
            .attempt_move("0071", Column::ToDo, Column::Doing, MoveKind::Forward)
            .await
            .unwrap();
        let second = board
            .attempt_move("0071", Column::ToDo, Column::Doing, MoveKind::Forward)
            .await
            .unwrap();

        assert!(first.applied());
        assert!(!second.applied());
    }

    #[tokio::test]
    async fn missing_ticket_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let (board, _) = board_with(store);
        assert!(matches!(
            board
                .attempt_move("9999", Column::ToDo, Column::Doing, MoveKind::Forward)
                .await,
            Err(crate::error::BoardError::TicketNotFound(_))
        ));
    }
}
