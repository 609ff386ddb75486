// request.rs — Agent action requests.
//
// A request is what an agent actually asks to do; the enforcement engine
// evaluates it against a stored capability. Amounts are integer cents
// and all arithmetic is checked against the safe integer ceiling so a
// cart can never silently wrap or exceed what a JSON peer can represent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::Action;

/// Upper bound on any amount the system will compute (2^53 - 1).
pub const MAX_SAFE_AMOUNT: u64 = 9_007_199_254_740_991;

/// One line of a spend request cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CartLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    /// Normalized category string.
    pub category: String,
    pub price_cents: u64,
    pub qty: u32,
}

/// A request to spend money at a vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpendRequest {
    pub request_id: String,
    /// RFC3339 timestamp supplied by the caller.
    pub ts: String,
    pub agent_id: String,
    /// Base64 Ed25519 verifying key (32 bytes decoded).
    pub agent_pubkey: String,
    pub action: Action,
    /// Normalized vendor string.
    pub vendor: String,
    pub currency: String,
    pub cart: Vec<CartLine>,
}

impl SpendRequest {
    /// Cumulative cart amount in cents, or `None` if any step of the
    /// accumulation leaves the safe integer range.
    pub fn total_amount(&self) -> Option<u64> {
        let mut total: u64 = 0;
        for line in &self.cart {
            let line_total = line.price_cents.checked_mul(line.qty as u64)?;
            total = total.checked_add(line_total)?;
            if total > MAX_SAFE_AMOUNT {
                return None;
            }
        }
        Some(total)
    }

    /// Total item count across the cart.
    pub fn item_count(&self) -> u64 {
        self.cart.iter().map(|line| line.qty as u64).sum()
    }
}

/// A request to invoke a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToolCallRequest {
    pub request_id: String,
    /// RFC3339 timestamp supplied by the caller.
    pub ts: String,
    pub agent_id: String,
    /// Base64 Ed25519 verifying key (32 bytes decoded).
    pub agent_pubkey: String,
    pub action: Action,
    pub tool_name: String,
    /// Normalized category tag.
    pub tool_category: String,
    /// Free-form JSON object; opaque to enforcement.
    pub tool_input: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(category: &str, price_cents: u64, qty: u32) -> CartLine {
        CartLine {
            sku: None,
            name: format!("{} item", category),
            category: category.to_string(),
            price_cents,
            qty,
        }
    }

    fn request(cart: Vec<CartLine>) -> SpendRequest {
        SpendRequest {
            request_id: "req_00000001".to_string(),
            ts: "2026-01-01T12:00:00Z".to_string(),
            agent_id: "agent:demo".to_string(),
            agent_pubkey: "AAAA".to_string(),
            action: Action::Spend,
            vendor: "sandboxmart".to_string(),
            currency: "USD".to_string(),
            cart,
        }
    }

    #[test]
    fn total_amount_sums_price_times_qty() {
        let req = request(vec![line("grocery", 599, 2), line("grocery", 349, 1)]);
        assert_eq!(req.total_amount(), Some(1547));
        assert_eq!(req.item_count(), 3);
    }

    #[test]
    fn total_at_safe_ceiling_is_accepted() {
        let req = request(vec![line("x", MAX_SAFE_AMOUNT, 1)]);
        assert_eq!(req.total_amount(), Some(MAX_SAFE_AMOUNT));
    }

    #[test]
    fn total_just_below_ceiling_is_accepted() {
        let req = request(vec![line("x", MAX_SAFE_AMOUNT - 1, 1)]);
        assert_eq!(req.total_amount(), Some(MAX_SAFE_AMOUNT - 1));
    }

    #[test]
    fn total_above_ceiling_is_none() {
        let req = request(vec![line("x", MAX_SAFE_AMOUNT, 1), line("y", 1, 1)]);
        assert_eq!(req.total_amount(), None);
    }

    #[test]
    fn multiplication_overflow_is_none() {
        let req = request(vec![line("x", u64::MAX / 2, 3)]);
        assert_eq!(req.total_amount(), None);
    }

    #[test]
    fn unknown_request_field_rejected() {
        let mut value = serde_json::to_value(request(vec![line("grocery", 100, 1)])).unwrap();
        value["extra"] = serde_json::json!("field");
        let result: Result<SpendRequest, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }

    #[test]
    fn cart_line_sku_is_optional() {
        let json = r#"{"name":"milk","category":"grocery","price_cents":299,"qty":1}"#;
        let parsed: CartLine = serde_json::from_str(json).unwrap();
        assert!(parsed.sku.is_none());
    }
}
