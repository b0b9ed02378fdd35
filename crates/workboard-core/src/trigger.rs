use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::WorkerKind;

// ---------------------------------------------------------------------------
// TriggerSignature
// ---------------------------------------------------------------------------

/// What identifies one physical user action. Embedded UI surfaces are known
/// to dispatch the same action twice, so two deliveries of the same worker
/// kind + literal content inside the window are the same click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSignature {
    pub worker: WorkerKind,
    pub content: String,
}

impl TriggerSignature {
    pub fn new(worker: WorkerKind, content: impl Into<String>) -> Self {
        Self {
            worker,
            content: content.into(),
        }
    }

    fn key(&self) -> String {
        format!("{}\u{1f}{}", self.worker, self.content)
    }
}

// ---------------------------------------------------------------------------
// Acceptance / AcceptedTrigger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceptance {
    pub accepted: bool,
    /// Fresh id when accepted; the originally accepted id when rejected,
    /// so callers can correlate the duplicate with the run it collapsed into.
    pub event_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedTrigger {
    pub event_id: Uuid,
    pub at: DateTime<Utc>,
    pub worker: WorkerKind,
}

// ---------------------------------------------------------------------------
// TriggerDeduplicator
// ---------------------------------------------------------------------------

/// Assigns every trigger a fresh event id at dispatch and rejects repeats of
/// the same signature inside a short rolling window. The invariant the rest
/// of the orchestrator leans on: one logical trigger, one appended message,
/// one run.
pub struct TriggerDeduplicator {
    window: Duration,
    recent: Vec<(String, Uuid, DateTime<Utc>)>,
    last_accepted: Option<AcceptedTrigger>,
}

impl TriggerDeduplicator {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window: Duration::milliseconds(window_ms),
            recent: Vec::new(),
            last_accepted: None,
        }
    }

    pub fn accept(&mut self, signature: &TriggerSignature) -> Acceptance {
        let now = Utc::now();
        self.prune(now);

        let key = signature.key();
        if let Some((_, id, _)) = self.recent.iter().find(|(k, _, _)| *k == key) {
            return Acceptance {
                accepted: false,
                event_id: *id,
            };
        }

        let event_id = Uuid::new_v4();
        self.recent.push((key, event_id, now));
        self.last_accepted = Some(AcceptedTrigger {
            event_id,
            at: now,
            worker: signature.worker,
        });
        Acceptance {
            accepted: true,
            event_id,
        }
    }

    /// The most recently accepted trigger, for "did my click register,
    /// and exactly once" diagnostics.
    pub fn last_accepted(&self) -> Option<&AcceptedTrigger> {
        self.last_accepted.as_ref()
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.recent.retain(|(_, _, at)| *at > cutoff);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_trigger_accepted() {
        let mut dedup = TriggerDeduplicator::new(2000);
        let sig = TriggerSignature::new(WorkerKind::Implementation, "implement 0071");
        let acceptance = dedup.accept(&sig);
        assert!(acceptance.accepted);
    }

    #[test]
    fn duplicate_in_window_rejected_with_original_id() {
        let mut dedup = TriggerDeduplicator::new(2000);
        let sig = TriggerSignature::new(WorkerKind::Qa, "qa 0099");

        let first = dedup.accept(&sig);
        let second = dedup.accept(&sig);

        assert!(first.accepted);
        assert!(!second.accepted);
        assert_eq!(second.event_id, first.event_id);
    }

    #[test]
    fn distinct_content_both_accepted() {
        let mut dedup = TriggerDeduplicator::new(2000);
        let a = dedup.accept(&TriggerSignature::new(WorkerKind::Qa, "qa 0001"));
        let b = dedup.accept(&TriggerSignature::new(WorkerKind::Qa, "qa 0002"));
        assert!(a.accepted);
        assert!(b.accepted);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn same_content_different_worker_accepted() {
        let mut dedup = TriggerDeduplicator::new(2000);
        let a = dedup.accept(&TriggerSignature::new(WorkerKind::Implementation, "0071"));
        let b = dedup.accept(&TriggerSignature::new(WorkerKind::Qa, "0071"));
        assert!(a.accepted);
        assert!(b.accepted);
    }

    #[test]
    fn window_expiry_allows_reacceptance() {
        // Zero-width window: nothing is ever considered a duplicate
        let mut dedup = TriggerDeduplicator::new(0);
        let sig = TriggerSignature::new(WorkerKind::Qa, "qa 0099");
        assert!(dedup.accept(&sig).accepted);
        assert!(dedup.accept(&sig).accepted);
    }

    #[test]
    fn last_accepted_tracks_most_recent() {
        let mut dedup = TriggerDeduplicator::new(2000);
        dedup.accept(&TriggerSignature::new(WorkerKind::Implementation, "0001"));
        let b = dedup.accept(&TriggerSignature::new(WorkerKind::Qa, "0002"));

        let last = dedup.last_accepted().unwrap();
        assert_eq!(last.event_id, b.event_id);
        assert_eq!(last.worker, WorkerKind::Qa);
    }

    #[test]
    fn accepted_id_changes_exactly_once_per_click() {
        // The duplicate delivery must not advance last_accepted
        let mut dedup = TriggerDeduplicator::new(2000);
        let sig = TriggerSignature::new(WorkerKind::Implementation, "implement 0071");

        let first = dedup.accept(&sig);
        let before = dedup.last_accepted().unwrap().event_id;
        dedup.accept(&sig);
        let after = dedup.last_accepted().unwrap().event_id;

        assert_eq!(before, first.event_id);
        assert_eq!(after, first.event_id);
    }
}
