// decision.rs — The enforcement decision vocabulary.
//
// Denial reasons are ordinary values, never errors: an agent being told
// "no" is the system working. The vocabulary is closed and machine-
// readable; translating codes into prose belongs to UI layers.

use serde::{Deserialize, Serialize};

/// The reason string carried by an allowed decision.
pub const ALLOWED_REASON: &str = "ALLOWED";

/// Allow or deny.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Allow,
    Deny,
}

/// Why an action was denied. The two category variants carry the
/// specific offending category, preserved in the wire code
/// (`CATEGORY_BLOCKED:<cat>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    NoCapability,
    Revoked,
    CapExpired,
    CapNotYetValid,
    BadSignature,
    BadCapabilityTime,
    ExecutorMismatch,
    ActionNotAllowed,
    VendorNotAllowed,
    CategoryBlocked(String),
    AmountExceedsMax,
    ToolNotAllowed,
    ToolCategoryBlocked(String),
}

impl DenyReason {
    /// The machine-readable wire code.
    pub fn code(&self) -> String {
        match self {
            DenyReason::NoCapability => "NO_CAPABILITY".to_string(),
            DenyReason::Revoked => "REVOKED".to_string(),
            DenyReason::CapExpired => "CAP_EXPIRED".to_string(),
            DenyReason::CapNotYetValid => "CAP_NOT_YET_VALID".to_string(),
            DenyReason::BadSignature => "BAD_SIGNATURE".to_string(),
            DenyReason::BadCapabilityTime => "BAD_CAPABILITY_TIME".to_string(),
            DenyReason::ExecutorMismatch => "EXECUTOR_MISMATCH".to_string(),
            DenyReason::ActionNotAllowed => "ACTION_NOT_ALLOWED".to_string(),
            DenyReason::VendorNotAllowed => "VENDOR_NOT_ALLOWED".to_string(),
            DenyReason::CategoryBlocked(cat) => format!("CATEGORY_BLOCKED:{}", cat),
            DenyReason::AmountExceedsMax => "AMOUNT_EXCEEDS_MAX".to_string(),
            DenyReason::ToolNotAllowed => "TOOL_NOT_ALLOWED".to_string(),
            DenyReason::ToolCategoryBlocked(cat) => format!("TOOL_CATEGORY_BLOCKED:{}", cat),
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The outcome of one enforcement evaluation, returned to the caller.
/// `receipt_id` matches the ACTION_ALLOWED or ACTION_DENIED receipt
/// appended to the audit log for this request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    pub request_id: String,
    pub decision: DecisionKind,
    pub reason: String,
    pub receipt_id: String,
}

impl ActionResult {
    /// An allow outcome.
    pub fn allow(request_id: impl Into<String>, receipt_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            decision: DecisionKind::Allow,
            reason: ALLOWED_REASON.to_string(),
            receipt_id: receipt_id.into(),
        }
    }

    /// A deny outcome carrying the reason's wire code.
    pub fn deny(
        request_id: impl Into<String>,
        reason: &DenyReason,
        receipt_id: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            decision: DecisionKind::Deny,
            reason: reason.code(),
            receipt_id: receipt_id.into(),
        }
    }

    /// Whether the action may proceed.
    pub fn is_allowed(&self) -> bool {
        self.decision == DecisionKind::Allow
    }
}
