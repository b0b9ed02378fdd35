//! `agent-client` — driver for the external agent runtime's job API.
//!
//! The runtime executes long-running work agents; this crate only knows how
//! to launch a job and ask how it's going. It knows nothing about tickets,
//! columns, or verdicts.
//!
//! # Architecture
//!
//! ```text
//! JobSpec
//!     │
//!     ▼
//! JobRunner        ← launch() / poll() boundary trait
//!     │
//!     ▼
//! HttpJobClient    ← POST /jobs, GET /jobs/{id}
//!     │
//!     ▼
//! RawJobPayload    ← normalizes the runtime's duck-typed report fields
//!     │               (completionReport | message | report | summary)
//!     ▼
//! JobStatus        ← the one contract downstream code sees
//! ```

use async_trait::async_trait;

pub mod error;
pub mod http;
pub mod types;

pub use error::AgentClientError;
pub use http::HttpJobClient;
pub use types::{JobHandle, JobSpec, JobStatus, RawJobPayload};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentClientError>;

/// Launch-and-poll boundary to the external job runtime.
///
/// Deliberately dumb: the orchestrator owns the polling cadence, timeout,
/// and retry budget; implementations just answer one request at a time.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Start a job. Fails with [`AgentClientError::Launch`] when the runtime
    /// rejects the spec; the runtime's message is preserved verbatim.
    async fn launch(&self, spec: &JobSpec) -> Result<JobHandle>;

    /// One status check. Transport failures are
    /// [`AgentClientError::Transport`] and may be retried by the caller.
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus>;
}
