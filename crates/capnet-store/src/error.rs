// error.rs — Error types for the persistence layer.

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Persisted state could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The audit log failed.
    #[error("audit log error: {0}")]
    Audit(#[from] capnet_audit::AuditError),

    /// The persisted issuer key material is unusable.
    #[error("issuer key material is unusable: {0}")]
    Keys(#[from] capnet_crypto::CryptoError),
}
