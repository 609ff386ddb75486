//! # capnet-daemon
//!
//! Capnet MCP server daemon.
//!
//! Starts an MCP server on stdio that agent frameworks (or any MCP
//! client) connect to. Every issue / enforce / revoke call flows
//! through the gateway into the trust engine and its audit log.
//!
//! ## Usage
//!
//! Typically started by the MCP client via `.mcp.json`:
//! ```json
//! {
//!   "mcpServers": {
//!     "capnet": {
//!       "type": "stdio",
//!       "command": "cargo",
//!       "args": ["run", "-p", "capnet-daemon"]
//!     }
//!   }
//! }
//! ```
//!
//! The data directory comes from `--data-dir`, falling back to the
//! `CAPNET_DATA_DIR` environment variable and then `./data`.

use anyhow::Result;
use clap::Parser;
use rmcp::ServiceExt;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use capnet_gateway::{CapnetConfig, CapnetGatewayServer};

/// Capnet MCP server.
#[derive(Parser)]
#[command(name = "capnet-daemon", about = "Capnet capability enforcement MCP server")]
struct Cli {
    /// Data directory (overrides CAPNET_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interfere with MCP on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("capnet_gateway=info".parse()?)
                .add_directive("capnet_engine=info".parse()?)
                .add_directive("capnet_daemon=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = match cli.data_dir {
        Some(dir) => CapnetConfig::for_dir(dir),
        None => CapnetConfig::from_env(),
    };

    tracing::info!("Starting capnet MCP server");
    tracing::info!("Data directory: {}", config.data_dir.display());

    let server = CapnetGatewayServer::new(config)?;

    tracing::info!("MCP server ready, waiting for client connection");

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

    service.waiting().await?;

    tracing::info!("MCP server shutting down");
    Ok(())
}
