// error.rs — Error types for key handling and signing.

use thiserror::Error;

/// Errors from key decoding, signing, and verification plumbing.
///
/// A failed signature check is `Ok(false)` from the verify functions;
/// these variants are reserved for structurally bad inputs.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Base64 input did not decode.
    #[error("invalid base64 in {context}: {source}")]
    BadBase64 {
        context: &'static str,
        source: base64::DecodeError,
    },

    /// Decoded bytes had the wrong length for their role.
    #[error("{context}: expected {expected} bytes, got {actual}")]
    BadLength {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The decoded bytes do not form a valid Ed25519 key.
    #[error("invalid key material in {context}")]
    BadKeyMaterial { context: &'static str },

    /// The body to sign could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonical(#[from] capnet_canonical::CanonicalError),
}
