//! # capnet-cli
//!
//! Command-line interface for the capnet capability core.
//!
//! Admin and ops surface over the same engine the MCP daemon serves:
//! - `capnet keygen` — mint an agent Ed25519 keypair
//! - `capnet issue spend/tool` — issue capabilities
//! - `capnet enforce spend/tool` — evaluate a request from a JSON file
//! - `capnet revoke <cap_id>` — kill delegated authority
//! - `capnet caps` — list capabilities with revocation flags
//! - `capnet receipts` — tail the audit log

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use capnet_gateway::CapnetConfig;

/// Capnet CLI — issue, enforce, revoke, inspect.
#[derive(Parser)]
#[command(name = "capnet", version, about)]
struct Cli {
    /// Data directory (overrides CAPNET_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an agent Ed25519 keypair.
    Keygen,
    /// Issue a capability.
    Issue {
        #[command(subcommand)]
        command: commands::issue::IssueCommands,
    },
    /// Evaluate an action request from a JSON file.
    Enforce {
        #[command(subcommand)]
        command: commands::enforce::EnforceCommands,
    },
    /// Revoke a capability by id.
    Revoke {
        /// The cap_id to revoke.
        cap_id: String,
    },
    /// List capabilities with their revocation flags.
    Caps,
    /// Show recent audit receipts.
    Receipts {
        /// Number of receipts to show.
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Only receipts at or after this RFC3339 timestamp.
        #[arg(long)]
        since: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match cli.data_dir {
        Some(dir) => CapnetConfig::for_dir(dir),
        None => CapnetConfig::from_env(),
    };

    match cli.command {
        Commands::Keygen => commands::keygen::execute(),
        Commands::Issue { command } => commands::issue::execute(&command, &config),
        Commands::Enforce { command } => commands::enforce::execute(&command, &config),
        Commands::Revoke { cap_id } => commands::revoke::execute(&cap_id, &config),
        Commands::Caps => commands::caps::execute(&config),
        Commands::Receipts { limit, since } => {
            commands::receipts::execute(limit, since.as_deref(), &config)
        }
    }
}
