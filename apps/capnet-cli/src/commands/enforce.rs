// enforce.rs — Evaluate an action request from a JSON file.
//
// The file holds the full request body (including the action field), so
// a script can replay exactly what an agent would submit.

use std::path::PathBuf;

use clap::Subcommand;

use capnet_engine::CoreService;
use capnet_gateway::CapnetConfig;
use capnet_schema::{SpendRequest, ToolCallRequest};

#[derive(Subcommand)]
pub enum EnforceCommands {
    /// Evaluate a spend request.
    Spend {
        /// Path to the request JSON.
        #[arg(long)]
        request: PathBuf,
    },
    /// Evaluate a tool-call request.
    Tool {
        /// Path to the request JSON.
        #[arg(long)]
        request: PathBuf,
    },
}

pub fn execute(cmd: &EnforceCommands, config: &CapnetConfig) -> anyhow::Result<()> {
    let mut core = CoreService::open(&config.data_dir)?;

    let result = match cmd {
        EnforceCommands::Spend { request } => {
            let raw = std::fs::read_to_string(request)?;
            let req: SpendRequest = serde_json::from_str(&raw)?;
            core.enforce_spend(req)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?
        }
        EnforceCommands::Tool { request } => {
            let raw = std::fs::read_to_string(request)?;
            let req: ToolCallRequest = serde_json::from_str(&raw)?;
            core.enforce_tool_call(req)
                .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
