use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentClientError {
    /// The runtime rejected the job spec outright (misconfiguration,
    /// missing remote repository, …). The runtime's message is preserved
    /// verbatim; these don't self-heal, so callers must not retry.
    #[error("launch rejected: {0}")]
    Launch(String),

    /// A transport-level failure while talking to the runtime. Transient;
    /// callers may retry within their budget.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to parse runtime response: {reason}\n  body: {body}")]
    Parse { reason: String, body: String },
}

pub type Result<T> = std::result::Result<T, AgentClientError>;
