// keygen.rs — Mint an agent Ed25519 keypair.
//
// Agent keys live outside the core; this is a convenience for demos and
// scripts. The keypair bytes are printed once and never stored.

use capnet_crypto::{fingerprint, IssuerKeypair};

pub fn execute() -> anyhow::Result<()> {
    let keypair = IssuerKeypair::generate();
    let output = serde_json::json!({
        "agent_pubkey": keypair.public_key_b64(),
        "agent_keypair": keypair.to_b64(),
        "fingerprint": fingerprint(&keypair.public_key_b64()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
