// domain.rs — Signing domain tags.
//
// Each artifact class that ever gets signed has its own domain. The
// prefix is prepended to the canonical JSON before signing, so the same
// body signed under two domains yields two unrelated signatures.

/// The artifact classes capnet signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Capability documents (`capdoc/0.1`).
    Capdoc,
    /// Audit receipts.
    Receipt,
    /// Agent action requests.
    ActionRequest,
}

impl Domain {
    /// The wire tag for this domain.
    pub fn tag(&self) -> &'static str {
        match self {
            Domain::Capdoc => "capdoc",
            Domain::Receipt => "receipt",
            Domain::ActionRequest => "actionrequest",
        }
    }

    /// The full ASCII prefix prepended to canonical bytes.
    pub fn prefix(&self) -> String {
        format!("capnet:{}/0.1:", self.tag())
    }
}
