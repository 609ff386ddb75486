// revoke.rs — Revoke a capability.

use capnet_engine::CoreService;
use capnet_gateway::CapnetConfig;

pub fn execute(cap_id: &str, config: &CapnetConfig) -> anyhow::Result<()> {
    let mut core = CoreService::open(&config.data_dir)?;
    let receipt = core
        .revoke(cap_id)
        .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;

    println!("Revoked {} (receipt {})", cap_id, receipt.receipt_id);
    Ok(())
}
