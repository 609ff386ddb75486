// keys.rs — Ed25519 keypair handling and base64 codecs.
//
// The issuer keypair is a process-lifetime identity: generated once,
// persisted as 64 keypair bytes (seed followed by verifying key, the
// NaCl layout ed25519-dalek calls "keypair bytes"), and reloaded on
// every subsequent start. Agent keypairs use the same machinery; only
// the issuer's secret ever lives inside the core.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Verifying keys are 32 bytes.
pub const PUBKEY_LEN: usize = 32;
/// Detached signatures are 64 bytes.
pub const SIG_LEN: usize = 64;
/// Persisted keypairs are 64 bytes (seed + verifying key).
pub const KEYPAIR_LEN: usize = 64;

/// An Ed25519 keypair with base64 persistence helpers.
pub struct IssuerKeypair {
    signing: SigningKey,
}

impl IssuerKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// Reconstruct a keypair from base64 keypair bytes.
    pub fn from_b64(keypair_b64: &str) -> Result<Self, CryptoError> {
        let bytes = decode_exact::<KEYPAIR_LEN>(keypair_b64, "keypair")?;
        let signing = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|_| CryptoError::BadKeyMaterial { context: "keypair" })?;
        Ok(Self { signing })
    }

    /// The base64 keypair bytes for persistence.
    pub fn to_b64(&self) -> String {
        B64.encode(self.signing.to_keypair_bytes())
    }

    /// The base64 verifying key.
    pub fn public_key_b64(&self) -> String {
        B64.encode(self.signing.verifying_key().to_bytes())
    }

    /// The underlying signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }
}

impl std::fmt::Debug for IssuerKeypair {
    // Never print secret material.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerKeypair")
            .field("public_key", &self.public_key_b64())
            .finish()
    }
}

/// Decode a base64 verifying key, validating length and curve point.
pub fn decode_pubkey(pubkey_b64: &str) -> Result<VerifyingKey, CryptoError> {
    let bytes = decode_exact::<PUBKEY_LEN>(pubkey_b64, "public key")?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::BadKeyMaterial {
        context: "public key",
    })
}

/// Decode a base64 detached signature, validating length.
pub fn decode_signature(sig_b64: &str) -> Result<ed25519_dalek::Signature, CryptoError> {
    let bytes = decode_exact::<SIG_LEN>(sig_b64, "signature")?;
    Ok(ed25519_dalek::Signature::from_bytes(&bytes))
}

/// Short SHA-256 fingerprint of a base64 key, for logs and CLI output.
pub fn fingerprint(key_b64: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key_b64.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..16].to_string()
}

/// Decode base64 into an exact-length array, or fail structurally.
fn decode_exact<const N: usize>(input: &str, context: &'static str) -> Result<[u8; N], CryptoError> {
    let bytes = B64
        .decode(input)
        .map_err(|source| CryptoError::BadBase64 { context, source })?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::BadLength {
            context,
            expected: N,
            actual,
        })
}
