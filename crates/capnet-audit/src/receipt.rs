// receipt.rs — Audit receipt data model.
//
// A receipt is one line in the audit log. The enforcement pipeline
// emits ACTION_ATTEMPT before touching the capability store and exactly
// one of ACTION_ALLOWED / ACTION_DENIED afterwards; issuance and
// revocation emit their own lifecycle receipts. The receipt_id carried
// in an ActionResult always names the allow/deny receipt for that
// evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use capnet_canonical::Domain;
use capnet_crypto::{sign_value, verify_value, CryptoError, SigningKey};
use capnet_schema::Proof;

/// What kind of event a receipt records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptEvent {
    /// A capability was issued.
    CapIssued,
    /// A capability was revoked.
    CapRevoked,
    /// An agent submitted an action request (recorded before any lookup,
    /// so attempts against unbound agents are still observable).
    ActionAttempt,
    /// The enforcement pipeline allowed an action.
    ActionAllowed,
    /// The enforcement pipeline denied an action.
    ActionDenied,
}

/// Compact per-event numbers; all fields optional so each event kind
/// carries only what applies to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_reason: Option<String>,
}

/// An immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub receipt_id: String,
    pub ts: DateTime<Utc>,
    pub event: ReceiptEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default)]
    pub summary: ReceiptSummary,
    /// Arbitrary JSON-safe context.
    #[serde(default)]
    pub meta: Value,
    /// Issuer signature over the proof-less body (receipt domain).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Receipt {
    /// Create a receipt with a fresh id and the current timestamp.
    /// Optional fields start empty; set them with the builder methods.
    pub fn new(event: ReceiptEvent) -> Self {
        Self {
            receipt_id: format!("rcpt_{}", Uuid::new_v4().simple()),
            ts: Utc::now(),
            event,
            cap_id: None,
            request_id: None,
            agent_id: None,
            vendor: None,
            summary: ReceiptSummary::default(),
            meta: Value::Null,
            proof: None,
        }
    }

    /// Set the capability id and return self.
    pub fn with_cap(mut self, cap_id: impl Into<String>) -> Self {
        self.cap_id = Some(cap_id.into());
        self
    }

    /// Set the request id and return self.
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the agent id and return self.
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the vendor and return self.
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Set the summary and return self.
    pub fn with_summary(mut self, summary: ReceiptSummary) -> Self {
        self.summary = summary;
        self
    }

    /// Set arbitrary metadata and return self.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }

    /// The proof-less body as a JSON value, for signing and verifying.
    pub fn unsigned_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("proof");
        }
        Ok(value)
    }
}

/// Attach an issuer proof to a receipt (receipt signing domain).
pub fn sign_receipt(receipt: &mut Receipt, key: &SigningKey) -> Result<(), AuditSignError> {
    let body = receipt.unsigned_value()?;
    let sig = sign_value(&body, key, Domain::Receipt)?;
    receipt.proof = Some(Proof {
        alg: capnet_schema::SIGNATURE_ALG.to_string(),
        sig,
    });
    Ok(())
}

/// Verify a receipt's proof against an issuer verifying key.
/// Returns false for an unsigned receipt.
pub fn verify_receipt(receipt: &Receipt, issuer_pubkey_b64: &str) -> Result<bool, AuditSignError> {
    let proof = match &receipt.proof {
        Some(p) => p,
        None => return Ok(false),
    };
    let body = receipt.unsigned_value()?;
    Ok(verify_value(&body, &proof.sig, issuer_pubkey_b64, Domain::Receipt)?)
}

/// Errors from receipt signing and verification.
#[derive(Debug, thiserror::Error)]
pub enum AuditSignError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
