use serde::{Deserialize, Serialize};

use crate::error::{AgentClientError, Result};

// ---------------------------------------------------------------------------
// JobSpec / JobHandle
// ---------------------------------------------------------------------------

/// What the runtime needs to act: an identifiable ticket reference, the
/// worker role, and the instructions payload. The runtime defines nothing
/// more about the payload's structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub ticket_id: String,
    pub worker: String,
    pub instructions: String,
}

/// Opaque handle to a launched job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    #[serde(alias = "id")]
    pub job_id: String,
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// The one status contract everything downstream sees.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Running { partial_text: Option<String> },
    Finished { final_text: String },
    Failed { message: String },
    Cancelled,
    Errored { message: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running { .. })
    }
}

// ---------------------------------------------------------------------------
// RawJobPayload
// ---------------------------------------------------------------------------

/// The runtime's poll response as observed on the wire.
///
/// The report text arrives under whichever field that runtime version felt
/// like: `completionReport`, `message`, `report`, or `summary`. This type is
/// the only place that knows about the variance; `normalize` collapses it
/// into [`JobStatus`] before anything downstream sees it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobPayload {
    pub status: String,
    #[serde(default)]
    pub completion_report: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub partial_text: Option<String>,
}

impl RawJobPayload {
    /// First non-empty report field, in the order the shapes were observed.
    fn text(&self) -> Option<String> {
        [
            &self.completion_report,
            &self.message,
            &self.report,
            &self.summary,
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
    }

    pub fn normalize(self) -> Result<JobStatus> {
        match self.status.as_str() {
            "running" => Ok(JobStatus::Running {
                partial_text: self.partial_text.clone().or_else(|| self.text()),
            }),
            "finished" => Ok(JobStatus::Finished {
                final_text: self.text().unwrap_or_default(),
            }),
            "failed" => Ok(JobStatus::Failed {
                message: self.text().unwrap_or_else(|| "job failed".to_string()),
            }),
            "cancelled" => Ok(JobStatus::Cancelled),
            "error" => Ok(JobStatus::Errored {
                message: self.text().unwrap_or_else(|| "job errored".to_string()),
            }),
            other => Err(AgentClientError::Parse {
                reason: format!("unknown job status '{other}'"),
                body: String::new(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
