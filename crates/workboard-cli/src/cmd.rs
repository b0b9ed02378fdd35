use anyhow::{bail, Context};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

use agent_client::HttpJobClient;
use workboard_core::config::Config;
use workboard_core::diagnostics::{DiagnosticRecord, MemorySink};
use workboard_core::error::BoardError;
use workboard_core::orchestrator::{Dispatch, Orchestrator};
use workboard_core::router::{ConversationRouter, LogEntry, LogEntryKind};
use workboard_core::run::RunStage;
use workboard_core::store::{BoardFile, TicketStore, YamlStore};
use workboard_core::ticket::Ticket;
use workboard_core::types::{AgentKind, Column, WorkerKind};
use workboard_core::{io, paths};

use crate::output;

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

pub fn init(root: &Path) -> anyhow::Result<()> {
    io::ensure_dir(&paths::workboard_dir(root))?;
    io::ensure_dir(&paths::logs_dir(root))?;

    let config_path = paths::config_path(root);
    if config_path.exists() {
        println!("already initialized: {}", config_path.display());
    } else {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "workboard".to_string());
        Config::new(name).save(root)?;
        println!("wrote {}", config_path.display());
    }

    let board_path = paths::board_path(root);
    if !board_path.exists() {
        let data = serde_yaml::to_string(&BoardFile::default())?;
        io::atomic_write(&board_path, data.as_bytes())?;
        println!("wrote {}", board_path.display());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// ticket
// ---------------------------------------------------------------------------

pub async fn ticket_add(root: &Path, id: &str, title: &str) -> anyhow::Result<()> {
    let store = YamlStore::new(paths::board_path(root));
    match store.get(id).await {
        Ok(_) => bail!(BoardError::TicketExists(id.to_string())),
        Err(BoardError::TicketNotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let body = format!("# {title}\n\n**Status:** Unassigned\n");
    store.put(&Ticket::new(id, body)).await?;
    println!("added ticket {id}");
    Ok(())
}

pub async fn ticket_list(root: &Path, json: bool) -> anyhow::Result<()> {
    let store = YamlStore::new(paths::board_path(root));
    let tickets = store.list().await?;

    if json {
        return output::print_json(&tickets);
    }

    let rows = tickets
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.column.to_string(),
                t.position.to_string(),
                t.moved_at.to_rfc3339(),
            ]
        })
        .collect();
    output::print_table(&["ID", "COLUMN", "POS", "MOVED AT"], rows);
    Ok(())
}

/// The external-editor path: a manual drag can land anywhere, so this
/// bypasses the pipeline rules on purpose and just appends to the target
/// column.
pub async fn ticket_move(root: &Path, id: &str, column: &str) -> anyhow::Result<()> {
    let column: Column = column.parse()?;
    let store = YamlStore::new(paths::board_path(root));

    let mut ticket = store.get(id).await?;
    ticket.position = store.max_position(column).await? + 1;
    ticket.column = column;
    ticket.moved_at = Utc::now();
    ticket.rewrite_status_header(column);
    store.put(&ticket).await?;

    println!("moved ticket {id} to {column} (position {})", ticket.position);
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub async fn run(root: &Path, worker: &str, message: &str, json: bool) -> anyhow::Result<()> {
    let worker: WorkerKind = worker.parse()?;
    let config = Config::load(root)?;
    for warning in config.validate() {
        eprintln!("warning: {}", warning.message);
    }

    let store = Arc::new(YamlStore::new(paths::board_path(root)));
    let runner = Arc::new(HttpJobClient::new(config.runtime.base_url.clone()));
    let sink = Arc::new(MemorySink::new());
    let router = Arc::new(ConversationRouter::new(sink.clone()));
    let orchestrator = Orchestrator::new(
        store,
        runner,
        router.clone(),
        sink.clone(),
        config.orchestrator.clone(),
    );

    let dispatch = orchestrator.handle_trigger(worker, message).await;
    let run = match dispatch {
        Dispatch::Rejected { event_id } => {
            println!("duplicate trigger; already accepted as {event_id}");
            return Ok(());
        }
        Dispatch::Completed(run) => run,
    };

    let entries = router.log(worker.channel());
    persist_log(root, worker.channel(), &entries).context("persist conversation log")?;
    persist_diagnostics(root, &sink.records()).context("persist diagnostics")?;

    if json {
        output::print_json(&entries)?;
    } else {
        for entry in &entries {
            print_entry(entry);
        }
    }

    if run.stage == RunStage::Failed {
        bail!("run {} failed", run.id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// log / diag
// ---------------------------------------------------------------------------

pub fn log(root: &Path, kind: &str) -> anyhow::Result<()> {
    let kind: AgentKind = kind.parse()?;
    let path = paths::log_path(root, kind);
    if !path.exists() {
        println!("no log yet for {kind}");
        return Ok(());
    }
    print!("{}", std::fs::read_to_string(&path)?);
    Ok(())
}

pub fn diag(root: &Path) -> anyhow::Result<()> {
    let path = paths::diagnostics_path(root);
    if !path.exists() {
        println!("no diagnostics recorded yet");
        return Ok(());
    }
    print!("{}", std::fs::read_to_string(&path)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entry_label(kind: LogEntryKind) -> &'static str {
    match kind {
        LogEntryKind::Trigger => "trigger",
        LogEntryKind::Stage => "stage",
        LogEntryKind::CompletionReport => "completion report",
        LogEntryKind::Failure => "failure",
    }
}

fn print_entry(entry: &LogEntry) {
    println!("[{}] {}: {}", entry.at.to_rfc3339(), entry_label(entry.kind), entry.text);
}

fn persist_log(root: &Path, kind: AgentKind, entries: &[LogEntry]) -> anyhow::Result<()> {
    let mut buf = String::new();
    for entry in entries {
        buf.push_str(&format!(
            "## [{}] {}\n\n{}\n\n",
            entry.at.to_rfc3339(),
            entry_label(entry.kind),
            entry.text
        ));
    }
    io::append_text(&paths::log_path(root, kind), &buf)?;
    Ok(())
}

fn persist_diagnostics(root: &Path, records: &[DiagnosticRecord]) -> anyhow::Result<()> {
    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }
    io::append_text(&paths::diagnostics_path(root), &buf)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
