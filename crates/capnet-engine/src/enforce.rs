// enforce.rs — The enforcement pipeline.
//
// One chokepoint, fixed verification order. The order is normative: it
// decides which denial reason surfaces when a capability has several
// defects at once. Checks proceed request-local → cap-structural →
// cap-trust → action-semantic:
//
//   1. emit ACTION_ATTEMPT (before any lookup)
//   2. amount safety (spend only; structural, not a denial)
//   3. capability lookup            → NO_CAPABILITY
//   4. signature over proof-less body → BAD_SIGNATURE
//   5. executor binding             → EXECUTOR_MISMATCH
//   6. time window                  → BAD_CAPABILITY_TIME / CAP_EXPIRED
//                                     / CAP_NOT_YET_VALID
//   7. revocation                   → REVOKED
//   8. action applicability         → ACTION_NOT_ALLOWED
//   9+ constraint checks            → VENDOR_NOT_ALLOWED /
//      CATEGORY_BLOCKED:<cat> / AMOUNT_EXCEEDS_MAX /
//      TOOL_NOT_ALLOWED / TOOL_CATEGORY_BLOCKED:<cat>
//
// The signature check precedes everything that reads a capability
// field, so no field of an untrusted artifact can influence policy.
// Expiry resolves ties against the requester: a capability is expired
// at the instant now == expires_at.
//
// Requests are expected to have passed schema validation (normalized
// vendor/category strings); comparisons here are plain equality.

use chrono::{DateTime, Utc};

use capnet_audit::{Receipt, ReceiptEvent, ReceiptSummary};
use capnet_canonical::Domain;
use capnet_crypto::verify_value;
use capnet_schema::{
    parse_timestamp, Action, ActionResult, Capability, DenyReason, SpendRequest, ToolCallRequest,
};
use capnet_store::{CapabilityStore, IssuerKeys};

use crate::error::ApiError;
use crate::receipts::emit;

/// Evaluate a validated spend request against the store.
pub fn evaluate_spend(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    req: &SpendRequest,
    now: DateTime<Utc>,
) -> Result<ActionResult, ApiError> {
    let total = req.total_amount();
    let item_count = req.item_count();

    // Attempt first, so requests from unbound agents are observable.
    emit(
        store,
        keys,
        Receipt::new(ReceiptEvent::ActionAttempt)
            .with_request(&req.request_id)
            .with_agent(&req.agent_id)
            .with_vendor(&req.vendor)
            .with_summary(ReceiptSummary {
                amount_cents: total,
                item_count: Some(item_count),
                denied_reason: None,
            }),
    )?;

    // Amount safety is a structural failure, not a denial: the request
    // itself is malformed.
    let total = total.ok_or(ApiError::AmountOverflow)?;

    let cap = match store.find_cap_for_agent(&req.agent_id, &req.agent_pubkey) {
        Some(cap) => cap,
        None => {
            return deny_spend(store, keys, req, None, total, item_count, DenyReason::NoCapability)
        }
    };

    judge_spend(store, keys, &cap, req, now, total, item_count)
}

/// Steps 4-12 for a spend request, against one candidate capability.
/// Split out so the executor-binding check stays testable even though
/// the lookup already filters on both executor fields.
fn judge_spend(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    cap: &Capability,
    req: &SpendRequest,
    now: DateTime<Utc>,
    total: u64,
    item_count: u64,
) -> Result<ActionResult, ApiError> {
    let cap_id = Some(cap.cap_id.as_str());
    let deny = |store: &mut CapabilityStore, reason: DenyReason| {
        deny_spend(store, keys, req, cap_id, total, item_count, reason)
    };

    // Signature before any other field is trusted.
    if !capability_signature_ok(cap) {
        return deny(store, DenyReason::BadSignature);
    }

    if cap.executor.agent_id != req.agent_id || cap.executor.agent_pubkey != req.agent_pubkey {
        return deny(store, DenyReason::ExecutorMismatch);
    }

    if let Some(reason) = check_time_window(cap, now) {
        return deny(store, reason);
    }

    if store.is_revoked(&cap.cap_id) {
        return deny(store, DenyReason::Revoked);
    }

    let spend = match cap.constraints.as_spend() {
        Some(spend) if cap.has_action(Action::Spend) => spend,
        _ => return deny(store, DenyReason::ActionNotAllowed),
    };

    if !spend.allowed_vendors.contains(&req.vendor) {
        return deny(store, DenyReason::VendorNotAllowed);
    }

    // First offending line wins; its category is preserved in the code.
    for line in &req.cart {
        if spend.blocked_categories.contains(&line.category) {
            return deny(store, DenyReason::CategoryBlocked(line.category.clone()));
        }
    }

    if total > spend.max_amount_cents {
        return deny(store, DenyReason::AmountExceedsMax);
    }

    let receipt = emit(
        store,
        keys,
        Receipt::new(ReceiptEvent::ActionAllowed)
            .with_request(&req.request_id)
            .with_agent(&req.agent_id)
            .with_vendor(&req.vendor)
            .with_cap(&cap.cap_id)
            .with_summary(ReceiptSummary {
                amount_cents: Some(total),
                item_count: Some(item_count),
                denied_reason: None,
            }),
    )?;

    Ok(ActionResult::allow(&req.request_id, receipt.receipt_id))
}

/// Evaluate a validated tool-call request against the store.
pub fn evaluate_tool_call(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    req: &ToolCallRequest,
    now: DateTime<Utc>,
) -> Result<ActionResult, ApiError> {
    emit(
        store,
        keys,
        Receipt::new(ReceiptEvent::ActionAttempt)
            .with_request(&req.request_id)
            .with_agent(&req.agent_id)
            .with_meta(serde_json::json!({
                "tool_name": req.tool_name,
                "tool_category": req.tool_category,
            })),
    )?;

    let cap = match store.find_cap_for_agent(&req.agent_id, &req.agent_pubkey) {
        Some(cap) => cap,
        None => return deny_tool(store, keys, req, None, DenyReason::NoCapability),
    };

    judge_tool_call(store, keys, &cap, req, now)
}

/// Steps 4-12 for a tool-call request.
fn judge_tool_call(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    cap: &Capability,
    req: &ToolCallRequest,
    now: DateTime<Utc>,
) -> Result<ActionResult, ApiError> {
    let cap_id = Some(cap.cap_id.as_str());
    let deny = |store: &mut CapabilityStore, reason: DenyReason| {
        deny_tool(store, keys, req, cap_id, reason)
    };

    if !capability_signature_ok(cap) {
        return deny(store, DenyReason::BadSignature);
    }

    if cap.executor.agent_id != req.agent_id || cap.executor.agent_pubkey != req.agent_pubkey {
        return deny(store, DenyReason::ExecutorMismatch);
    }

    if let Some(reason) = check_time_window(cap, now) {
        return deny(store, reason);
    }

    if store.is_revoked(&cap.cap_id) {
        return deny(store, DenyReason::Revoked);
    }

    let tools = match cap.constraints.as_tool_call() {
        Some(tools) if cap.has_action(Action::ToolCall) => tools,
        _ => return deny(store, DenyReason::ActionNotAllowed),
    };

    if !tools.allowed_tools.contains(&req.tool_name) {
        return deny(store, DenyReason::ToolNotAllowed);
    }

    if tools.blocked_tool_categories.contains(&req.tool_category) {
        return deny(
            store,
            DenyReason::ToolCategoryBlocked(req.tool_category.clone()),
        );
    }

    let receipt = emit(
        store,
        keys,
        Receipt::new(ReceiptEvent::ActionAllowed)
            .with_request(&req.request_id)
            .with_agent(&req.agent_id)
            .with_cap(&cap.cap_id)
            .with_meta(serde_json::json!({
                "tool_name": req.tool_name,
            })),
    )?;

    Ok(ActionResult::allow(&req.request_id, receipt.receipt_id))
}

// ── Shared checks ────────────────────────────────────────────────

/// Verify the capability's proof against its own embedded issuer key.
/// Any structural defect (missing proof, garbled base64, unserializable
/// body) makes the artifact untrusted, which reads as a bad signature.
fn capability_signature_ok(cap: &Capability) -> bool {
    let body = match cap.unsigned_value() {
        Ok(body) => body,
        Err(_) => return false,
    };
    let proof = match &cap.proof {
        Some(proof) => proof,
        None => return false,
    };
    verify_value(&body, &proof.sig, &cap.issuer.pubkey, Domain::Capdoc).unwrap_or(false)
}

/// Time semantics: expired at `now >= expires_at`, not yet valid at
/// `now < not_before`. Unparseable timestamps on a stored capability
/// are a distinct defect from expiry.
fn check_time_window(cap: &Capability, now: DateTime<Utc>) -> Option<DenyReason> {
    match parse_timestamp(&cap.expires_at) {
        None => return Some(DenyReason::BadCapabilityTime),
        Some(expires) if now >= expires => return Some(DenyReason::CapExpired),
        Some(_) => {}
    }
    if let Some(nb) = &cap.not_before {
        match parse_timestamp(nb) {
            None => return Some(DenyReason::BadCapabilityTime),
            Some(not_before) if now < not_before => return Some(DenyReason::CapNotYetValid),
            Some(_) => {}
        }
    }
    None
}

fn deny_spend(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    req: &SpendRequest,
    cap_id: Option<&str>,
    total: u64,
    item_count: u64,
    reason: DenyReason,
) -> Result<ActionResult, ApiError> {
    let mut receipt = Receipt::new(ReceiptEvent::ActionDenied)
        .with_request(&req.request_id)
        .with_agent(&req.agent_id)
        .with_vendor(&req.vendor)
        .with_summary(ReceiptSummary {
            amount_cents: Some(total),
            item_count: Some(item_count),
            denied_reason: Some(reason.code()),
        });
    if let Some(cap_id) = cap_id {
        receipt = receipt.with_cap(cap_id);
    }
    let receipt = emit(store, keys, receipt)?;
    tracing::info!(
        request_id = %req.request_id,
        agent_id = %req.agent_id,
        reason = %reason,
        "spend denied"
    );
    Ok(ActionResult::deny(&req.request_id, &reason, receipt.receipt_id))
}

fn deny_tool(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    req: &ToolCallRequest,
    cap_id: Option<&str>,
    reason: DenyReason,
) -> Result<ActionResult, ApiError> {
    let mut receipt = Receipt::new(ReceiptEvent::ActionDenied)
        .with_request(&req.request_id)
        .with_agent(&req.agent_id)
        .with_summary(ReceiptSummary {
            amount_cents: None,
            item_count: None,
            denied_reason: Some(reason.code()),
        })
        .with_meta(serde_json::json!({
            "tool_name": req.tool_name,
        }));
    if let Some(cap_id) = cap_id {
        receipt = receipt.with_cap(cap_id);
    }
    let receipt = emit(store, keys, receipt)?;
    tracing::info!(
        request_id = %req.request_id,
        agent_id = %req.agent_id,
        reason = %reason,
        "tool call denied"
    );
    Ok(ActionResult::deny(&req.request_id, &reason, receipt.receipt_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capnet_crypto::IssuerKeypair;
    use capnet_schema::{
        CartLine, DecisionKind, SpendConstraints, ToolCallConstraints,
    };
    use capnet_store::IssuerKeys;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::issuer::{issue_spend, issue_tool_call, IssueSpendInput, IssueToolCallInput};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: CapabilityStore,
        keys: IssuerKeys,
        agent: IssuerKeypair,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let store = CapabilityStore::open(dir.path()).unwrap();
        let keys = IssuerKeys::load_or_generate(&store.issuer_keys_path()).unwrap();
        Fixture {
            _dir: dir,
            store,
            keys,
            agent: IssuerKeypair::generate(),
        }
    }

    fn demo_constraints() -> SpendConstraints {
        SpendConstraints {
            currency: "USD".to_string(),
            max_amount_cents: 5000,
            allowed_vendors: vec!["sandboxmart".to_string()],
            blocked_categories: vec![
                "alcohol".to_string(),
                "tobacco".to_string(),
                "gift_cards".to_string(),
            ],
        }
    }

    fn issue_demo_cap(fx: &mut Fixture, now: DateTime<Utc>) -> Capability {
        issue_spend(
            &mut fx.store,
            &fx.keys,
            IssueSpendInput {
                template: "spend.sandbox.v1".to_string(),
                agent_id: "agent:demo".to_string(),
                agent_pubkey: fx.agent.public_key_b64(),
                subject_id: None,
                constraints: demo_constraints(),
            },
            now,
        )
        .unwrap()
    }

    fn grocery_request(fx: &Fixture) -> SpendRequest {
        SpendRequest {
            request_id: "req_00000001".to_string(),
            ts: "2026-01-01T12:00:00Z".to_string(),
            agent_id: "agent:demo".to_string(),
            agent_pubkey: fx.agent.public_key_b64(),
            action: Action::Spend,
            vendor: "sandboxmart".to_string(),
            currency: "USD".to_string(),
            cart: vec![
                CartLine {
                    sku: None,
                    name: "bread".to_string(),
                    category: "grocery".to_string(),
                    price_cents: 599,
                    qty: 2,
                },
                CartLine {
                    sku: None,
                    name: "milk".to_string(),
                    category: "grocery".to_string(),
                    price_cents: 349,
                    qty: 1,
                },
            ],
        }
    }

    fn tool_request(fx: &Fixture, tool: &str, category: &str) -> ToolCallRequest {
        ToolCallRequest {
            request_id: "req_00000002".to_string(),
            ts: "2026-01-01T12:00:00Z".to_string(),
            agent_id: "agent:demo".to_string(),
            agent_pubkey: fx.agent.public_key_b64(),
            action: Action::ToolCall,
            tool_name: tool.to_string(),
            tool_category: category.to_string(),
            tool_input: json!({"query": "x"}),
        }
    }

    #[test]
    fn happy_path_allows_and_audits() {
        let mut fx = fixture();
        let now = Utc::now();
        let cap = issue_demo_cap(&mut fx, now);
        let req = grocery_request(&fx);

        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert!(result.is_allowed());
        assert_eq!(result.reason, "ALLOWED");

        let receipts = fx.store.read_receipts(None, None).unwrap();
        // CAP_ISSUED, ACTION_ATTEMPT, ACTION_ALLOWED.
        assert_eq!(receipts.len(), 3);
        assert_eq!(receipts[0].event, ReceiptEvent::CapIssued);
        assert_eq!(receipts[1].event, ReceiptEvent::ActionAttempt);
        assert_eq!(receipts[1].summary.amount_cents, Some(1547));
        assert_eq!(receipts[1].summary.item_count, Some(3));
        assert_eq!(receipts[2].event, ReceiptEvent::ActionAllowed);
        assert_eq!(receipts[2].summary.amount_cents, Some(1547));
        assert_eq!(receipts[2].cap_id.as_deref(), Some(cap.cap_id.as_str()));
        assert_eq!(receipts[2].receipt_id, result.receipt_id);
    }

    #[test]
    fn no_capability_for_unbound_agent() {
        let mut fx = fixture();
        let req = grocery_request(&fx);

        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, Utc::now()).unwrap();
        assert_eq!(result.decision, DecisionKind::Deny);
        assert_eq!(result.reason, "NO_CAPABILITY");

        let receipts = fx.store.read_receipts(None, None).unwrap();
        assert_eq!(receipts.len(), 2);
        assert_eq!(receipts[0].event, ReceiptEvent::ActionAttempt);
        assert_eq!(receipts[1].event, ReceiptEvent::ActionDenied);
        assert_eq!(
            receipts[1].summary.denied_reason.as_deref(),
            Some("NO_CAPABILITY")
        );
        assert_eq!(receipts[1].receipt_id, result.receipt_id);
    }

    #[test]
    fn wrong_pubkey_yields_no_capability_not_mismatch() {
        // The lookup filters on both executor fields, so a foreign key
        // finds nothing; EXECUTOR_MISMATCH needs a candidate in hand.
        let mut fx = fixture();
        let now = Utc::now();
        issue_demo_cap(&mut fx, now);

        let other = IssuerKeypair::generate();
        let mut req = grocery_request(&fx);
        req.agent_pubkey = other.public_key_b64();

        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "NO_CAPABILITY");
    }

    #[test]
    fn executor_mismatch_surfaces_when_candidate_in_hand() {
        let mut fx = fixture();
        let now = Utc::now();
        let cap = issue_demo_cap(&mut fx, now);

        let other = IssuerKeypair::generate();
        let mut req = grocery_request(&fx);
        req.agent_pubkey = other.public_key_b64();

        let result =
            judge_spend(&mut fx.store, &fx.keys, &cap, &req, now, 1547, 3).unwrap();
        assert_eq!(result.reason, "EXECUTOR_MISMATCH");
    }

    #[test]
    fn tampered_capability_yields_bad_signature() {
        let mut fx = fixture();
        let now = Utc::now();
        let cap = issue_demo_cap(&mut fx, now);

        // Alter one byte of the proof-less body after signing.
        let mut tampered = cap.clone();
        if let capnet_schema::Constraints::Spend(c) = &mut tampered.constraints {
            c.max_amount_cents = 5_000_000;
        }
        fx.store.insert_capability(tampered).unwrap();

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "BAD_SIGNATURE");
    }

    #[test]
    fn bad_signature_wins_over_expiry() {
        // Wrong key AND expired: the surfaced reason is BAD_SIGNATURE,
        // because nothing on an untrusted artifact is read first.
        let mut fx = fixture();
        let issued_at = Utc::now() - Duration::hours(48);
        let cap = issue_demo_cap(&mut fx, issued_at);

        let attacker = IssuerKeypair::generate();
        let mut forged = cap.clone();
        let body = forged.unsigned_value().unwrap();
        let sig =
            capnet_crypto::sign_value(&body, attacker.signing_key(), Domain::Capdoc).unwrap();
        forged.proof = Some(capnet_schema::Proof {
            alg: capnet_schema::SIGNATURE_ALG.to_string(),
            sig,
        });
        fx.store.insert_capability(forged).unwrap();

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, Utc::now()).unwrap();
        assert_eq!(result.reason, "BAD_SIGNATURE");
    }

    #[test]
    fn expired_capability_denied() {
        let mut fx = fixture();
        let issued_at = Utc::now() - Duration::hours(48);
        issue_demo_cap(&mut fx, issued_at);

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, Utc::now()).unwrap();
        assert_eq!(result.reason, "CAP_EXPIRED");
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let mut fx = fixture();
        let now = Utc::now();
        let cap = issue_demo_cap(&mut fx, now);
        let expires = parse_timestamp(&cap.expires_at).unwrap();

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, expires).unwrap();
        assert_eq!(result.reason, "CAP_EXPIRED");

        // One instant earlier the capability is still live.
        let result = evaluate_spend(
            &mut fx.store,
            &fx.keys,
            &req,
            expires - Duration::milliseconds(1),
        )
        .unwrap();
        assert!(result.is_allowed());
    }

    #[test]
    fn not_yet_valid_capability_denied() {
        let mut fx = fixture();
        let now = Utc::now();
        let cap = issue_demo_cap(&mut fx, now);

        // The issuer never sets not_before, so rebuild and re-sign a
        // variant with one in the future.
        let mut future_cap = cap.clone();
        future_cap.not_before =
            Some((now + Duration::hours(1)).to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        let body = future_cap.unsigned_value().unwrap();
        let sig = capnet_crypto::sign_value(&body, fx.keys.signing_key(), Domain::Capdoc).unwrap();
        future_cap.proof = Some(capnet_schema::Proof {
            alg: capnet_schema::SIGNATURE_ALG.to_string(),
            sig,
        });
        fx.store.insert_capability(future_cap).unwrap();

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "CAP_NOT_YET_VALID");
    }

    #[test]
    fn unparseable_expiry_is_bad_capability_time() {
        let mut fx = fixture();
        let now = Utc::now();
        let cap = issue_demo_cap(&mut fx, now);

        let mut garbled = cap.clone();
        garbled.expires_at = "sometime tomorrow".to_string();
        let body = garbled.unsigned_value().unwrap();
        let sig = capnet_crypto::sign_value(&body, fx.keys.signing_key(), Domain::Capdoc).unwrap();
        garbled.proof = Some(capnet_schema::Proof {
            alg: capnet_schema::SIGNATURE_ALG.to_string(),
            sig,
        });
        fx.store.insert_capability(garbled).unwrap();

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "BAD_CAPABILITY_TIME");
    }

    #[test]
    fn revoked_capability_denied_with_revoked() {
        let mut fx = fixture();
        let now = Utc::now();
        let cap = issue_demo_cap(&mut fx, now);
        fx.store.revoke(&cap.cap_id).unwrap();

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "REVOKED");

        let receipts = fx.store.read_receipts(None, None).unwrap();
        let denied = receipts.last().unwrap();
        assert_eq!(denied.summary.denied_reason.as_deref(), Some("REVOKED"));
        assert_eq!(denied.cap_id.as_deref(), Some(cap.cap_id.as_str()));
    }

    #[test]
    fn spend_against_tool_cap_is_action_not_allowed() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_tool_call(
            &mut fx.store,
            &fx.keys,
            IssueToolCallInput {
                template: "tools.default.v1".to_string(),
                agent_id: "agent:demo".to_string(),
                agent_pubkey: fx.agent.public_key_b64(),
                subject_id: None,
                constraints: ToolCallConstraints {
                    allowed_tools: vec!["web_search".to_string()],
                    blocked_tool_categories: vec![],
                    max_calls: None,
                },
            },
            now,
        )
        .unwrap();

        let req = grocery_request(&fx);
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "ACTION_NOT_ALLOWED");
    }

    #[test]
    fn vendor_not_allowed() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_demo_cap(&mut fx, now);

        let mut req = grocery_request(&fx);
        req.vendor = "othermart".to_string();
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "VENDOR_NOT_ALLOWED");
    }

    #[test]
    fn blocked_category_names_first_offending_line() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_demo_cap(&mut fx, now);

        let mut req = grocery_request(&fx);
        req.cart.push(CartLine {
            sku: None,
            name: "wine".to_string(),
            category: "alcohol".to_string(),
            price_cents: 1499,
            qty: 1,
        });
        req.cart.push(CartLine {
            sku: None,
            name: "cigarettes".to_string(),
            category: "tobacco".to_string(),
            price_cents: 999,
            qty: 1,
        });

        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "CATEGORY_BLOCKED:alcohol");
    }

    #[test]
    fn empty_blocked_categories_allows_any_category() {
        let mut fx = fixture();
        let now = Utc::now();
        let mut constraints = demo_constraints();
        constraints.blocked_categories.clear();
        issue_spend(
            &mut fx.store,
            &fx.keys,
            IssueSpendInput {
                template: "spend.sandbox.v1".to_string(),
                agent_id: "agent:demo".to_string(),
                agent_pubkey: fx.agent.public_key_b64(),
                subject_id: None,
                constraints,
            },
            now,
        )
        .unwrap();

        let mut req = grocery_request(&fx);
        req.cart[0].category = "alcohol".to_string();
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert!(result.is_allowed());
    }

    #[test]
    fn amount_at_budget_allowed_one_over_denied() {
        let mut fx = fixture();
        let now = Utc::now();
        let mut constraints = demo_constraints();
        constraints.max_amount_cents = 1000;
        issue_spend(
            &mut fx.store,
            &fx.keys,
            IssueSpendInput {
                template: "spend.sandbox.v1".to_string(),
                agent_id: "agent:demo".to_string(),
                agent_pubkey: fx.agent.public_key_b64(),
                subject_id: None,
                constraints,
            },
            now,
        )
        .unwrap();

        let mut req = grocery_request(&fx);
        req.cart = vec![CartLine {
            sku: None,
            name: "exact".to_string(),
            category: "grocery".to_string(),
            price_cents: 1000,
            qty: 1,
        }];
        assert!(evaluate_spend(&mut fx.store, &fx.keys, &req, now)
            .unwrap()
            .is_allowed());

        req.request_id = "req_00000003".to_string();
        req.cart = vec![CartLine {
            sku: None,
            name: "over".to_string(),
            category: "grocery".to_string(),
            price_cents: 1001,
            qty: 1,
        }];
        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "AMOUNT_EXCEEDS_MAX");
    }

    #[test]
    fn amount_overflow_is_structural_and_attempt_remains() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_demo_cap(&mut fx, now);

        // Hand-built request past the schema bounds: only reachable for
        // in-process callers, which is exactly who this check protects
        // against.
        let mut req = grocery_request(&fx);
        req.cart = vec![CartLine {
            sku: None,
            name: "huge".to_string(),
            category: "grocery".to_string(),
            price_cents: capnet_schema::MAX_SAFE_AMOUNT,
            qty: 2,
        }];

        let result = evaluate_spend(&mut fx.store, &fx.keys, &req, now);
        assert!(matches!(result, Err(ApiError::AmountOverflow)));

        let receipts = fx.store.read_receipts(None, None).unwrap();
        let attempt = receipts.last().unwrap();
        assert_eq!(attempt.event, ReceiptEvent::ActionAttempt);
        assert_eq!(attempt.summary.amount_cents, None);
    }

    #[test]
    fn tool_call_happy_path() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_tool_call(
            &mut fx.store,
            &fx.keys,
            IssueToolCallInput {
                template: "tools.default.v1".to_string(),
                agent_id: "agent:demo".to_string(),
                agent_pubkey: fx.agent.public_key_b64(),
                subject_id: None,
                constraints: ToolCallConstraints {
                    allowed_tools: vec!["web_search".to_string()],
                    blocked_tool_categories: vec!["filesystem".to_string()],
                    max_calls: None,
                },
            },
            now,
        )
        .unwrap();

        let req = tool_request(&fx, "web_search", "network");
        let result = evaluate_tool_call(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert!(result.is_allowed());
    }

    #[test]
    fn unknown_tool_denied() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_tool_call(
            &mut fx.store,
            &fx.keys,
            IssueToolCallInput {
                template: "tools.default.v1".to_string(),
                agent_id: "agent:demo".to_string(),
                agent_pubkey: fx.agent.public_key_b64(),
                subject_id: None,
                constraints: ToolCallConstraints {
                    allowed_tools: vec!["web_search".to_string()],
                    blocked_tool_categories: vec![],
                    max_calls: None,
                },
            },
            now,
        )
        .unwrap();

        let req = tool_request(&fx, "shell_exec", "system");
        let result = evaluate_tool_call(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "TOOL_NOT_ALLOWED");
    }

    #[test]
    fn blocked_tool_category_carries_category() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_tool_call(
            &mut fx.store,
            &fx.keys,
            IssueToolCallInput {
                template: "tools.default.v1".to_string(),
                agent_id: "agent:demo".to_string(),
                agent_pubkey: fx.agent.public_key_b64(),
                subject_id: None,
                constraints: ToolCallConstraints {
                    allowed_tools: vec!["fs_read".to_string()],
                    blocked_tool_categories: vec!["filesystem".to_string()],
                    max_calls: None,
                },
            },
            now,
        )
        .unwrap();

        let req = tool_request(&fx, "fs_read", "filesystem");
        let result = evaluate_tool_call(&mut fx.store, &fx.keys, &req, now).unwrap();
        assert_eq!(result.reason, "TOOL_CATEGORY_BLOCKED:filesystem");
    }

    #[test]
    fn every_evaluation_emits_attempt_then_one_outcome() {
        let mut fx = fixture();
        let now = Utc::now();
        issue_demo_cap(&mut fx, now);

        let req = grocery_request(&fx);
        evaluate_spend(&mut fx.store, &fx.keys, &req, now).unwrap();

        let mut denied_req = grocery_request(&fx);
        denied_req.request_id = "req_00000009".to_string();
        denied_req.vendor = "othermart".to_string();
        evaluate_spend(&mut fx.store, &fx.keys, &denied_req, now).unwrap();

        let receipts = fx.store.read_receipts(None, None).unwrap();
        for request_id in ["req_00000001", "req_00000009"] {
            let for_request: Vec<_> = receipts
                .iter()
                .filter(|r| r.request_id.as_deref() == Some(request_id))
                .collect();
            assert_eq!(for_request.len(), 2);
            assert_eq!(for_request[0].event, ReceiptEvent::ActionAttempt);
            assert!(matches!(
                for_request[1].event,
                ReceiptEvent::ActionAllowed | ReceiptEvent::ActionDenied
            ));
        }
    }
}
