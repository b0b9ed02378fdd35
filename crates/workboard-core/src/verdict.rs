//! Verdict extraction from agent completion reports.
//!
//! Work agents end their reports with a single structured line:
//!
//! ```text
//! RESULT: PASS — 0071
//! ```
//!
//! Only that literal, case-sensitive line counts. Prose mentions of
//! "pass"/"fail" are ignored on purpose: a false positive drives a column
//! move the pipeline treats as irreversible, so `Unknown` is always the
//! safer answer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static RESULT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*RESULT: (PASS|FAIL) — (\S+)\s*$").unwrap());

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedVerdict {
    pub verdict: Verdict,
    pub ticket_id: Option<String>,
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

/// Extract the verdict from a completion report.
///
/// The first matching line wins; later occurrences are ignored, which
/// defends against reports that echo example result lines back. Never
/// fails: unparseable input is simply `Unknown`.
pub fn parse(report: &str) -> ParsedVerdict {
    match RESULT_LINE.captures(report) {
        Some(cap) => {
            let verdict = match &cap[1] {
                "PASS" => Verdict::Pass,
                _ => Verdict::Fail,
            };
            ParsedVerdict {
                verdict,
                ticket_id: Some(cap[2].to_string()),
            }
        }
        None => ParsedVerdict {
            verdict: Verdict::Unknown,
            ticket_id: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
