// receipts.rs — Tail the audit log.

use capnet_engine::CoreService;
use capnet_gateway::CapnetConfig;
use capnet_schema::parse_timestamp;

pub fn execute(limit: usize, since: Option<&str>, config: &CapnetConfig) -> anyhow::Result<()> {
    let since = match since {
        None => None,
        Some(raw) => Some(
            parse_timestamp(raw)
                .ok_or_else(|| anyhow::anyhow!("--since '{}' is not an RFC3339 timestamp", raw))?,
        ),
    };

    let core = CoreService::open(&config.data_dir)?;
    let receipts = core
        .list_receipts(Some(limit), since)
        .map_err(|e| anyhow::anyhow!("{}: {}", e.code(), e))?;

    if receipts.is_empty() {
        println!("No receipts.");
        return Ok(());
    }

    println!(
        "{:<20} {:<16} {:<20} {:<14} DETAIL",
        "TIMESTAMP", "EVENT", "AGENT", "AMOUNT"
    );
    println!("{}", "-".repeat(96));
    for receipt in &receipts {
        let amount = receipt
            .summary
            .amount_cents
            .map(|cents| format!("{} cents", cents))
            .unwrap_or_else(|| "-".to_string());
        let detail = receipt
            .summary
            .denied_reason
            .clone()
            .or_else(|| receipt.cap_id.clone())
            .or_else(|| receipt.request_id.clone())
            .unwrap_or_default();
        println!(
            "{:<20} {:<16} {:<20} {:<14} {}",
            receipt.ts.format("%Y-%m-%d %H:%M:%S"),
            format!("{:?}", receipt.event),
            receipt.agent_id.as_deref().unwrap_or("-"),
            amount,
            detail,
        );
    }
    Ok(())
}
