use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{BoardError, Result};
use crate::io;
use crate::ticket::Ticket;
use crate::types::Column;

// ---------------------------------------------------------------------------
// TicketStore
// ---------------------------------------------------------------------------

/// Abstract ticket persistence.
///
/// Implementations must report "not found" (`BoardError::TicketNotFound`)
/// distinctly from store-level failures (`BoardError::Store`) — the
/// orchestrator's error handling depends on telling the two apart.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Ticket>;

    /// Insert or replace a ticket.
    async fn put(&self, ticket: &Ticket) -> Result<()>;

    async fn list(&self) -> Result<Vec<Ticket>>;

    /// Highest position currently occupied in `column`; 0 when empty.
    async fn max_position(&self, column: Column) -> Result<u32>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store, used in tests and as the reference implementation.
#[derive(Default)]
pub struct MemoryStore {
    tickets: Mutex<HashMap<String, Ticket>>,
    #[cfg(test)]
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail with a store error.
    #[cfg(test)]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Ticket> {
        self.tickets
            .lock()
            .expect("ticket map lock")
            .get(id)
            .cloned()
            .ok_or_else(|| BoardError::TicketNotFound(id.to_string()))
    }

    async fn put(&self, ticket: &Ticket) -> Result<()> {
        #[cfg(test)]
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BoardError::Store("injected write failure".into()));
        }
        self.tickets
            .lock()
            .expect("ticket map lock")
            .insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .lock()
            .expect("ticket map lock")
            .values()
            .cloned()
            .collect();
        tickets.sort_by(|a, b| (a.column, a.position).cmp(&(b.column, b.position)));
        Ok(tickets)
    }

    async fn max_position(&self, column: Column) -> Result<u32> {
        Ok(self
            .tickets
            .lock()
            .expect("ticket map lock")
            .values()
            .filter(|t| t.column == column)
            .map(|t| t.position)
            .max()
            .unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// YamlStore
// ---------------------------------------------------------------------------

/// The whole board as one YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
}

fn default_version() -> u32 {
    1
}

impl Default for BoardFile {
    fn default() -> Self {
        Self {
            version: 1,
            tickets: Vec::new(),
        }
    }
}

/// File-backed store: one `board.yaml` document, written atomically.
pub struct YamlStore {
    path: PathBuf,
}

impl YamlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BoardFile> {
        if !self.path.exists() {
            return Ok(BoardFile::default());
        }
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| BoardError::Store(format!("read {}: {e}", self.path.display())))?;
        serde_yaml::from_str(&data)
            .map_err(|e| BoardError::Store(format!("parse {}: {e}", self.path.display())))
    }

    fn save(&self, board: &BoardFile) -> Result<()> {
        let data = serde_yaml::to_string(board)
            .map_err(|e| BoardError::Store(format!("serialize board: {e}")))?;
        io::atomic_write(&self.path, data.as_bytes())
            .map_err(|e| BoardError::Store(format!("write {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl TicketStore for YamlStore {
    async fn get(&self, id: &str) -> Result<Ticket> {
        self.load()?
            .tickets
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| BoardError::TicketNotFound(id.to_string()))
    }

    async fn put(&self, ticket: &Ticket) -> Result<()> {
        let mut board = self.load()?;
        match board.tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(existing) => *existing = ticket.clone(),
            None => board.tickets.push(ticket.clone()),
        }
        self.save(&board)
    }

    async fn list(&self) -> Result<Vec<Ticket>> {
        let mut tickets = self.load()?.tickets;
        tickets.sort_by(|a, b| (a.column, a.position).cmp(&(b.column, b.position)));
        Ok(tickets)
    }

    async fn max_position(&self, column: Column) -> Result<u32> {
        Ok(self
            .load()?
            .tickets
            .iter()
            .filter(|t| t.column == column)
            .map(|t| t.position)
            .max()
            .unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
