// signing.rs — Detached signatures over canonical bytes.
//
// The signed message is always canonicalize(domain, body). Callers pass
// the proof-less body; forgetting to strip the proof field produces a
// signature that will never verify, which is the safe failure direction.

use ed25519_dalek::{Signer, SigningKey, Verifier};
use serde_json::Value;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use capnet_canonical::{canonicalize, Domain};

use crate::error::CryptoError;
use crate::keys::{decode_pubkey, decode_signature};

/// Sign `body` under `domain`, returning the base64 detached signature.
pub fn sign_value(body: &Value, key: &SigningKey, domain: Domain) -> Result<String, CryptoError> {
    let message = canonicalize(domain, body)?;
    let sig = key.sign(&message);
    Ok(B64.encode(sig.to_bytes()))
}

/// Verify a base64 signature over `body` under `domain`.
///
/// Returns `Ok(false)` for a genuine mismatch. Structural defects in the
/// key or signature encoding return `Err`, so callers can distinguish
/// "forged" from "garbled".
pub fn verify_value(
    body: &Value,
    sig_b64: &str,
    pubkey_b64: &str,
    domain: Domain,
) -> Result<bool, CryptoError> {
    let pubkey = decode_pubkey(pubkey_b64)?;
    let sig = decode_signature(sig_b64)?;
    let message = canonicalize(domain, body)?;
    Ok(pubkey.verify(&message, &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::IssuerKeypair;
    use serde_json::json;

    #[test]
    fn sign_then_verify_round_trip() {
        let kp = IssuerKeypair::generate();
        let body = json!({"cap_id": "cap_x", "actions": ["spend"]});
        let sig = sign_value(&body, kp.signing_key(), Domain::Capdoc).unwrap();
        assert!(verify_value(&body, &sig, &kp.public_key_b64(), Domain::Capdoc).unwrap());
    }

    #[test]
    fn signing_is_deterministic_for_fixed_key() {
        // Ed25519 is deterministic: same key + same message = same signature.
        let seed = [42u8; 32];
        let key = SigningKey::from_bytes(&seed);
        let body = json!({"a": 1});
        let s1 = sign_value(&body, &key, Domain::Capdoc).unwrap();
        let s2 = sign_value(&body, &key, Domain::Capdoc).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn key_order_does_not_affect_signature() {
        let kp = IssuerKeypair::generate();
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
        let sig = sign_value(&a, kp.signing_key(), Domain::Capdoc).unwrap();
        assert!(verify_value(&b, &sig, &kp.public_key_b64(), Domain::Capdoc).unwrap());
    }

    #[test]
    fn tampered_body_fails_verification() {
        let kp = IssuerKeypair::generate();
        let body = json!({"amount": 100});
        let sig = sign_value(&body, kp.signing_key(), Domain::Capdoc).unwrap();
        let tampered = json!({"amount": 101});
        assert!(!verify_value(&tampered, &sig, &kp.public_key_b64(), Domain::Capdoc).unwrap());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp = IssuerKeypair::generate();
        let other = IssuerKeypair::generate();
        let body = json!({"k": "v"});
        let sig = sign_value(&body, kp.signing_key(), Domain::Capdoc).unwrap();
        assert!(!verify_value(&body, &sig, &other.public_key_b64(), Domain::Capdoc).unwrap());
    }

    #[test]
    fn domain_separation_prevents_cross_protocol_reuse() {
        // A capability signature must not verify as a receipt signature.
        let kp = IssuerKeypair::generate();
        let body = json!({"k": "v"});
        let sig = sign_value(&body, kp.signing_key(), Domain::Capdoc).unwrap();
        assert!(!verify_value(&body, &sig, &kp.public_key_b64(), Domain::Receipt).unwrap());
    }

    #[test]
    fn garbled_signature_is_error_not_false() {
        let kp = IssuerKeypair::generate();
        let body = json!({"k": "v"});
        let result = verify_value(&body, "%%%", &kp.public_key_b64(), Domain::Capdoc);
        assert!(result.is_err());
    }
}
