use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::types::Column;

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A unit of work tracked through the pipeline.
///
/// The body is opaque markdown except for an optional `**Status:**` header
/// line, which is rewritten to the destination column's display name on every
/// applied move. Tickets are created externally and never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    #[serde(default)]
    pub column: Column,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub body: String,
    #[serde(default = "Utc::now")]
    pub moved_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            column: Column::Unassigned,
            position: 0,
            body: body.into(),
            moved_at: Utc::now(),
        }
    }

    /// Rewrite the `**Status:**` header line, if present, to `column`'s
    /// display name. Leaves the rest of the body untouched.
    pub fn rewrite_status_header(&mut self, column: Column) {
        static STATUS_LINE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?m)^\*\*Status:\*\*.*$").unwrap());

        if let Some(m) = STATUS_LINE.find(&self.body) {
            let replacement = format!("**Status:** {}", column.display_name());
            let mut body = String::with_capacity(self.body.len());
            body.push_str(&self.body[..m.start()]);
            body.push_str(&replacement);
            body.push_str(&self.body[m.end()..]);
            self.body = body;
        }
    }
}

// ---------------------------------------------------------------------------
// Ticket references in trigger content
// ---------------------------------------------------------------------------

/// Extract the target ticket id from a trigger message.
///
/// Tickets are numbered (e.g. `0071`); the first 2–6 digit sequence in the
/// message wins, with or without a leading `#`.
pub fn parse_ticket_ref(content: &str) -> Option<String> {
    static TICKET_REF: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"#?\b([0-9]{2,6})\b").unwrap());

    TICKET_REF
        .captures(content)
        .map(|cap| cap[1].to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
