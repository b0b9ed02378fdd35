mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "workboard",
    about = "Agent work-board orchestrator — trigger runs, watch logs, inspect the board",
    version,
    propagate_version = true
)]
struct Cli {
    /// Board root (default: auto-detect from .workboard/ or .git/)
    #[arg(long, global = true, env = "WORKBOARD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a workboard in the current project
    Init,

    /// Manage tickets on the board
    Ticket {
        #[command(subcommand)]
        subcommand: TicketSubcommand,
    },

    /// Trigger a work-agent run (implementation | qa)
    Run {
        /// Worker kind: implementation | qa
        worker: String,
        /// The trigger message; must reference a ticket id
        message: Vec<String>,
    },

    /// Print one agent kind's conversation log
    Log {
        /// project-manager | implementation-agent | qa-agent | standup
        kind: String,
    },

    /// Show orchestrator diagnostics (last trigger, skipped moves, orphans)
    Diag,
}

#[derive(Subcommand)]
enum TicketSubcommand {
    /// Add a ticket in the Unassigned column
    Add {
        id: String,
        /// Ticket title used in the generated body
        title: String,
    },
    /// List tickets by column and position
    List,
    /// Manually move a ticket (the external-editor path: no pipeline rules)
    Move { id: String, column: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = root::resolve_root(cli.root.as_deref());

    match cli.command {
        Commands::Init => cmd::init(&root),
        Commands::Ticket { subcommand } => match subcommand {
            TicketSubcommand::Add { id, title } => cmd::ticket_add(&root, &id, &title).await,
            TicketSubcommand::List => cmd::ticket_list(&root, cli.json).await,
            TicketSubcommand::Move { id, column } => cmd::ticket_move(&root, &id, &column).await,
        },
        Commands::Run { worker, message } => {
            cmd::run(&root, &worker, &message.join(" "), cli.json).await
        }
        Commands::Log { kind } => cmd::log(&root, &kind),
        Commands::Diag => cmd::diag(&root),
    }
}
