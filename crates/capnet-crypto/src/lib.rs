//! # capnet-crypto
//!
//! Ed25519 signing and verification over canonical bytes.
//!
//! All signatures are detached and computed over
//! `capnet_canonical::canonicalize(domain, body)` — never over caller-
//! supplied bytes. Keys and signatures travel as base64; decoding
//! validates the exact byte length (64-byte keypairs, 32-byte verifying
//! keys, 64-byte signatures) and any defect is a structural
//! [`CryptoError`], not a silent verification failure.

pub mod error;
pub mod keys;
pub mod signing;

pub use error::CryptoError;
pub use keys::{decode_pubkey, decode_signature, fingerprint, IssuerKeypair, PUBKEY_LEN, SIG_LEN};
pub use signing::{sign_value, verify_value};

// Re-exported so downstream crates name the signing key type without a
// direct ed25519-dalek dependency.
pub use ed25519_dalek::SigningKey;
