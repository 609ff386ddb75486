// config.rs — Gateway configuration.
//
// One knob that matters: where the store lives. Resolved from the
// CAPNET_DATA_DIR environment variable, defaulting to ./data, which
// keeps the demo deployment a zero-config start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "CAPNET_DATA_DIR";

/// Request bodies above this size are rejected before validation, to
/// bound canonicalization cost.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Configuration for the gateway server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapnetConfig {
    /// Directory holding capabilities.json, revocations.json,
    /// issuer_keys.json, and audit.jsonl.
    pub data_dir: PathBuf,

    /// Maximum serialized request size in bytes.
    pub max_body_bytes: usize,
}

impl CapnetConfig {
    /// Resolve the config from the environment.
    pub fn from_env() -> Self {
        let data_dir = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        Self {
            data_dir,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    /// Config rooted at an explicit directory (tests, CLI overrides).
    pub fn for_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}
