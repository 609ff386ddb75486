// caps.rs — List capabilities with revocation flags.

use capnet_engine::CoreService;
use capnet_gateway::CapnetConfig;
use capnet_schema::Action;

pub fn execute(config: &CapnetConfig) -> anyhow::Result<()> {
    let core = CoreService::open(&config.data_dir)?;
    let caps = core.list_capabilities();

    if caps.is_empty() {
        println!("No capabilities issued.");
        return Ok(());
    }

    println!(
        "{:<40} {:<20} {:<26} {:<8} STATE",
        "CAP_ID", "AGENT", "EXPIRES", "ACTIONS"
    );
    println!("{}", "-".repeat(104));
    for entry in &caps {
        let cap = &entry.capability;
        let actions: Vec<&str> = cap
            .actions
            .iter()
            .map(|a| match a {
                Action::Spend => "spend",
                Action::ToolCall => "tool_call",
            })
            .collect();
        println!(
            "{:<40} {:<20} {:<26} {:<8} {}",
            cap.cap_id,
            cap.executor.agent_id,
            cap.expires_at,
            actions.join(","),
            if entry.is_revoked { "revoked" } else { "active" },
        );
    }
    println!();
    println!("{} capability(ies)", caps.len());
    Ok(())
}
