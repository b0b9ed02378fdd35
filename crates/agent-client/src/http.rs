use async_trait::async_trait;

use crate::error::{AgentClientError, Result};
use crate::types::{JobHandle, JobSpec, JobStatus, RawJobPayload};
use crate::JobRunner;

// ─── HttpJobClient ────────────────────────────────────────────────────────

/// Job API driver: `POST {base}/jobs` to launch, `GET {base}/jobs/{id}` to
/// poll. Response bodies pass through [`RawJobPayload::normalize`] so the
/// runtime's shape variance never leaves this crate.
pub struct HttpJobClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpJobClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl JobRunner for HttpJobClient {
    async fn launch(&self, spec: &JobSpec) -> Result<JobHandle> {
        let url = format!("{}/jobs", self.base_url);
        tracing::debug!(ticket_id = %spec.ticket_id, worker = %spec.worker, "launching job");
        let response = self
            .client
            .post(&url)
            .json(spec)
            .send()
            .await
            .map_err(|e| AgentClientError::Transport(format!("launch: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // The runtime's rejection body is the diagnostic; keep it whole.
            let body = response.text().await.unwrap_or_default();
            return Err(AgentClientError::Launch(format!(
                "runtime rejected job ({status}): {body}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentClientError::Transport(format!("launch response: {e}")))?;
        serde_json::from_str(&body).map_err(|e| AgentClientError::Parse {
            reason: format!("launch response: {e}"),
            body,
        })
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus> {
        let url = format!("{}/jobs/{}", self.base_url, handle.job_id);
        tracing::trace!(job_id = %handle.job_id, "polling job");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AgentClientError::Transport(format!("poll: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentClientError::Transport(format!(
                "poll returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentClientError::Transport(format!("poll response: {e}")))?;
        let payload: RawJobPayload =
            serde_json::from_str(&body).map_err(|e| AgentClientError::Parse {
                reason: format!("poll response: {e}"),
                body: body.clone(),
            })?;
        payload.normalize()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
