// capability.rs — The capability document.
//
// A capability is an immutable signed artifact authorizing a bounded
// class of actions for exactly one agent. The signed body is the record
// with `proof` removed; timestamps stay RFC3339 strings on the wire so
// the signature covers the exact bytes the issuer produced.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The document version literal every capability carries.
pub const CAPDOC_VERSION: &str = "capdoc/0.1";

/// The only signature algorithm this core mints or accepts.
pub const SIGNATURE_ALG: &str = "ed25519";

/// Action verbs a capability can authorize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Spend,
    ToolCall,
}

/// Resource classes the schema admits. Only `spend` and `tool_call` are
/// ever minted by this issuer; the other two exist so externally stored
/// documents still parse and verify.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Spend,
    ToolCall,
    SandboxMerchant,
    Generic,
}

/// What the capability is scoped to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    /// Normalized vendor string. For spend capabilities this must be a
    /// member of `allowed_vendors`.
    pub vendor: String,
}

/// The minting authority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IssuerRef {
    pub id: String,
    /// Base64 Ed25519 verifying key (32 bytes decoded).
    pub pubkey: String,
}

/// The human principal on whose behalf authority is delegated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubjectRef {
    pub id: String,
}

/// The unique agent bound to this capability. Only this identity may
/// present the capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExecutorRef {
    pub agent_id: String,
    /// Base64 Ed25519 verifying key (32 bytes decoded).
    pub agent_pubkey: String,
}

/// Revocation modes. `strict` is the only mode enforcement consumes;
/// `lease` and `one_time` are reserved for a later phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RevocationMode {
    Strict,
    Lease,
    OneTime,
}

/// How and where revocation for this capability is checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RevocationPolicy {
    pub mode: RevocationMode,
    pub oracle: String,
}

/// Spend-shaped constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpendConstraints {
    pub currency: String,
    pub max_amount_cents: u64,
    /// Normalized, non-empty.
    pub allowed_vendors: Vec<String>,
    /// Normalized; may be empty.
    pub blocked_categories: Vec<String>,
}

/// Tool-call-shaped constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolCallConstraints {
    pub allowed_tools: Vec<String>,
    /// Normalized; may be empty.
    pub blocked_tool_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_calls: Option<u64>,
}

/// Tagged constraint record. Externally tagged on the wire
/// (`{"spend": {...}}` / `{"tool_call": {...}}`) so an unknown variant
/// or a stray field is a parse error, not a silent widening. The engine
/// narrows explicitly before reading any constraint field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Constraints {
    Spend(SpendConstraints),
    ToolCall(ToolCallConstraints),
}

impl Constraints {
    /// Narrow to spend constraints, if that is what this is.
    pub fn as_spend(&self) -> Option<&SpendConstraints> {
        match self {
            Constraints::Spend(c) => Some(c),
            Constraints::ToolCall(_) => None,
        }
    }

    /// Narrow to tool-call constraints, if that is what this is.
    pub fn as_tool_call(&self) -> Option<&ToolCallConstraints> {
        match self {
            Constraints::ToolCall(c) => Some(c),
            Constraints::Spend(_) => None,
        }
    }
}

/// The signature over the canonicalized proof-less body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Proof {
    pub alg: String,
    /// Base64 detached signature (64 bytes decoded).
    pub sig: String,
}

/// A signed, scoped, time-bounded, revocable permission artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Capability {
    pub version: String,
    /// Opaque unique identifier, 8-128 characters.
    pub cap_id: String,
    /// RFC3339. Kept as a string so the signature covers the exact bytes.
    pub issued_at: String,
    /// RFC3339; must be after `issued_at`.
    pub expires_at: String,
    /// RFC3339; when present, at or before `expires_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    pub issuer: IssuerRef,
    pub subject: SubjectRef,
    pub executor: ExecutorRef,
    pub resource: Resource,
    /// Non-empty set of authorized verbs.
    pub actions: Vec<Action>,
    pub constraints: Constraints,
    pub revocation: RevocationPolicy,
    /// Absent only on an unsigned document under construction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Capability {
    /// The proof-less body as a JSON value — the exact thing that gets
    /// signed and verified.
    pub fn unsigned_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("proof");
        }
        Ok(value)
    }

    /// Whether this capability authorizes `action`.
    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}
