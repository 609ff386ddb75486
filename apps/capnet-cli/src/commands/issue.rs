// issue.rs — Issue subcommands: spend, tool.

use clap::Subcommand;

use capnet_engine::{CoreService, IssueSpendInput, IssueToolCallInput};
use capnet_gateway::CapnetConfig;
use capnet_schema::{SpendConstraints, ToolCallConstraints};

#[derive(Subcommand)]
pub enum IssueCommands {
    /// Issue a spend capability.
    Spend {
        /// Agent identity to bind the capability to.
        #[arg(long)]
        agent_id: String,
        /// Base64 Ed25519 verifying key of the agent.
        #[arg(long)]
        agent_pubkey: String,
        /// Budget ceiling in integer cents.
        #[arg(long)]
        max_amount_cents: u64,
        /// Comma-separated allowed vendors (first becomes the pinned
        /// resource vendor).
        #[arg(long, value_delimiter = ',')]
        vendors: Vec<String>,
        /// Comma-separated blocked categories.
        #[arg(long, value_delimiter = ',', default_value = "")]
        blocked_categories: Vec<String>,
        /// Template tag recorded on the issuance receipt.
        #[arg(long, default_value = "spend.sandbox.v1")]
        template: String,
        /// Principal on whose behalf authority is delegated.
        #[arg(long)]
        subject_id: Option<String>,
    },
    /// Issue a tool-call capability.
    Tool {
        /// Agent identity to bind the capability to.
        #[arg(long)]
        agent_id: String,
        /// Base64 Ed25519 verifying key of the agent.
        #[arg(long)]
        agent_pubkey: String,
        /// Comma-separated allowed tool names.
        #[arg(long, value_delimiter = ',')]
        tools: Vec<String>,
        /// Comma-separated blocked tool categories.
        #[arg(long, value_delimiter = ',', default_value = "")]
        blocked_categories: Vec<String>,
        /// Reserved call budget (admitted, not yet enforced).
        #[arg(long)]
        max_calls: Option<u64>,
        /// Template tag recorded on the issuance receipt.
        #[arg(long, default_value = "tools.default.v1")]
        template: String,
        /// Principal on whose behalf authority is delegated.
        #[arg(long)]
        subject_id: Option<String>,
    },
}

pub fn execute(cmd: &IssueCommands, config: &CapnetConfig) -> anyhow::Result<()> {
    let mut core = CoreService::open(&config.data_dir)?;

    let cap = match cmd {
        IssueCommands::Spend {
            agent_id,
            agent_pubkey,
            max_amount_cents,
            vendors,
            blocked_categories,
            template,
            subject_id,
        } => core
            .issue_spend_capability(IssueSpendInput {
                template: template.clone(),
                agent_id: agent_id.clone(),
                agent_pubkey: agent_pubkey.clone(),
                subject_id: subject_id.clone(),
                constraints: SpendConstraints {
                    currency: "USD".to_string(),
                    max_amount_cents: *max_amount_cents,
                    allowed_vendors: vendors.clone(),
                    blocked_categories: non_empty(blocked_categories),
                },
            })
            .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?,
        IssueCommands::Tool {
            agent_id,
            agent_pubkey,
            tools,
            blocked_categories,
            max_calls,
            template,
            subject_id,
        } => core
            .issue_tool_call_capability(IssueToolCallInput {
                template: template.clone(),
                agent_id: agent_id.clone(),
                agent_pubkey: agent_pubkey.clone(),
                subject_id: subject_id.clone(),
                constraints: ToolCallConstraints {
                    allowed_tools: tools.clone(),
                    blocked_tool_categories: non_empty(blocked_categories),
                    max_calls: *max_calls,
                },
            })
            .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?,
    };

    println!("{}", serde_json::to_string_pretty(&cap)?);
    Ok(())
}

/// Clap's empty default_value yields [""], which is not "no entries".
fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .collect()
}
