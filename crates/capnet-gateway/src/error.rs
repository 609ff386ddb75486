// error.rs — Error types for the gateway.

use thiserror::Error;

/// Errors raised while constructing or running the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The underlying store could not be opened.
    #[error("store error: {0}")]
    Store(#[from] capnet_store::StoreError),

    /// A generic error.
    #[error("{0}")]
    Other(String),
}
