use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A stage in the fixed board pipeline. Tickets only ever move forward
/// through this order, with one gated exception (see `board::MoveKind::QaFail`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    #[default]
    Unassigned,
    ToDo,
    Doing,
    Qa,
    HumanInLoop,
}

impl Column {
    pub fn all() -> &'static [Column] {
        &[
            Column::Unassigned,
            Column::ToDo,
            Column::Doing,
            Column::Qa,
            Column::HumanInLoop,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Column> {
        let all = Column::all();
        all.get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Column::Unassigned => "unassigned",
            Column::ToDo => "to_do",
            Column::Doing => "doing",
            Column::Qa => "qa",
            Column::HumanInLoop => "human_in_loop",
        }
    }

    /// Human-facing name, used when rewriting a ticket's status header.
    pub fn display_name(self) -> &'static str {
        match self {
            Column::Unassigned => "Unassigned",
            Column::ToDo => "To Do",
            Column::Doing => "Doing",
            Column::Qa => "QA",
            Column::HumanInLoop => "Human in Loop",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Column {
    type Err = crate::error::BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // An absent or blank column is the bootstrap case for tickets
            // created outside the orchestrator.
            "" | "unassigned" => Ok(Column::Unassigned),
            "to_do" | "to-do" | "todo" => Ok(Column::ToDo),
            "doing" => Ok(Column::Doing),
            "qa" => Ok(Column::Qa),
            "human_in_loop" | "human-in-loop" => Ok(Column::HumanInLoop),
            _ => Err(crate::error::BoardError::InvalidColumn(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentKind
// ---------------------------------------------------------------------------

/// One independent conversation log exists per agent kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    ProjectManager,
    ImplementationAgent,
    QaAgent,
    Standup,
}

impl AgentKind {
    pub fn all() -> &'static [AgentKind] {
        &[
            AgentKind::ProjectManager,
            AgentKind::ImplementationAgent,
            AgentKind::QaAgent,
            AgentKind::Standup,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::ProjectManager => "project-manager",
            AgentKind::ImplementationAgent => "implementation-agent",
            AgentKind::QaAgent => "qa-agent",
            AgentKind::Standup => "standup",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = crate::error::BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project-manager" | "project_manager" => Ok(AgentKind::ProjectManager),
            "implementation-agent" | "implementation_agent" => Ok(AgentKind::ImplementationAgent),
            "qa-agent" | "qa_agent" => Ok(AgentKind::QaAgent),
            "standup" => Ok(AgentKind::Standup),
            _ => Err(crate::error::BoardError::InvalidAgentKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerKind
// ---------------------------------------------------------------------------

/// The two agent kinds that actually execute runs against tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Implementation,
    Qa,
}

impl WorkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerKind::Implementation => "implementation",
            WorkerKind::Qa => "qa",
        }
    }

    /// The conversation log this worker's runs stream to.
    pub fn channel(self) -> AgentKind {
        match self {
            WorkerKind::Implementation => AgentKind::ImplementationAgent,
            WorkerKind::Qa => AgentKind::QaAgent,
        }
    }

    /// The column a ticket is expected to be in when a run of this kind
    /// starts. Both kinds work the ticket in `Doing`.
    pub fn expected_source(self) -> Column {
        match self {
            WorkerKind::Implementation => Column::ToDo,
            WorkerKind::Qa => Column::Qa,
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkerKind {
    type Err = crate::error::BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "implementation" => Ok(WorkerKind::Implementation),
            "qa" => Ok(WorkerKind::Qa),
            _ => Err(crate::error::BoardError::InvalidAgentKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
