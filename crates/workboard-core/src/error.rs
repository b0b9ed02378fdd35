use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("not initialized: run 'workboard init'")]
    NotInitialized,

    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    #[error("ticket already exists: {0}")]
    TicketExists(String),

    #[error("invalid column: {0}")]
    InvalidColumn(String),

    #[error("invalid agent kind: {0}")]
    InvalidAgentKind(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("poll failed after {attempts} attempts: {last}")]
    PollExhausted { attempts: u32, last: String },

    #[error("run timed out after {0} seconds")]
    Timeout(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BoardError>;
