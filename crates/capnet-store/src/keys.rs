// keys.rs — The persisted issuer keypair.
//
// Generated once on first start, loaded on every subsequent start, so
// the process keeps one signing identity across restarts. Rotation is
// out of scope; nothing here ever rewrites an existing key file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use capnet_crypto::{IssuerKeypair, SigningKey};

use crate::atomic::write_json_atomic;
use crate::error::StoreError;

/// Default identity string for a locally generated issuer.
const DEFAULT_ISSUER_ID: &str = "issuer:capnet";

/// On-disk shape of `issuer_keys.json`.
#[derive(Debug, Serialize, Deserialize)]
struct IssuerKeyFile {
    issuer_id: String,
    /// Base64 verifying key (32 bytes decoded).
    public_key: String,
    /// Base64 keypair bytes (64 bytes decoded).
    keypair: String,
}

/// The issuer's process-lifetime signing identity.
pub struct IssuerKeys {
    issuer_id: String,
    keypair: IssuerKeypair,
}

impl IssuerKeys {
    /// Load the issuer keys from `path`, generating and persisting a
    /// fresh keypair if the file does not exist yet.
    ///
    /// An unreadable or unusable key file is a hard error: unlike the
    /// capability index, nothing can be trusted without the keys, and
    /// silently regenerating them would orphan every issued capability.
    pub fn load_or_generate(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let file: IssuerKeyFile = serde_json::from_str(&content)?;
            let keypair = IssuerKeypair::from_b64(&file.keypair)?;
            return Ok(Self {
                issuer_id: file.issuer_id,
                keypair,
            });
        }

        let keypair = IssuerKeypair::generate();
        let file = IssuerKeyFile {
            issuer_id: DEFAULT_ISSUER_ID.to_string(),
            public_key: keypair.public_key_b64(),
            keypair: keypair.to_b64(),
        };
        write_json_atomic(path, &file)?;
        tracing::info!(path = %path.display(), "generated issuer keypair");

        Ok(Self {
            issuer_id: file.issuer_id,
            keypair,
        })
    }

    /// The issuer identity recorded in minted capabilities.
    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    /// Base64 verifying key.
    pub fn public_key_b64(&self) -> String {
        self.keypair.public_key_b64()
    }

    /// The signing key, for capability and receipt proofs.
    pub fn signing_key(&self) -> &SigningKey {
        self.keypair.signing_key()
    }
}
