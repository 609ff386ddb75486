// error.rs — Error types for the audit subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from audit log operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log file could not be opened or created.
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A write to the log failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A receipt could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
