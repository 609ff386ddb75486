// validate.rs — The strict schema boundary.
//
// Every external input is validated (and normalized) here before it
// reaches business logic. Normalization of vendor and category strings
// happens exactly once, in place, at this boundary; the enforcement
// engine then compares with plain equality.
//
// Validators return the first defect found, with a dotted field path,
// so callers get actionable INVALID_INPUT details.

use chrono::{DateTime, Utc};

use crate::capability::{
    Action, Capability, Constraints, SpendConstraints, ToolCallConstraints, CAPDOC_VERSION,
    SIGNATURE_ALG,
};
use crate::error::ValidationError;
use crate::request::{SpendRequest, ToolCallRequest, MAX_SAFE_AMOUNT};

/// Bounds applied at the schema boundary.
pub const CAP_ID_MIN_LEN: usize = 8;
pub const CAP_ID_MAX_LEN: usize = 128;
pub const MAX_ID_LEN: usize = 128;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_LIST_LEN: usize = 64;
pub const MAX_CART_LINES: usize = 100;
pub const PRICE_CENTS_MAX: u64 = 5_000_000;
pub const QTY_MAX: u32 = 1_000;
pub const MAX_TOOL_INPUT_BYTES: usize = 65_536;

/// Trim and lowercase. Applied to vendor and category strings once, at
/// parse time.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Parse an RFC3339 timestamp into UTC, or `None` if malformed.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn require(cond: bool, field: &str, message: &str) -> Result<(), ValidationError> {
    if cond {
        Ok(())
    } else {
        Err(ValidationError::field(field, message))
    }
}

fn check_id(value: &str, field: &str) -> Result<(), ValidationError> {
    require(!value.trim().is_empty(), field, "must not be empty")?;
    require(
        value.len() <= MAX_ID_LEN,
        field,
        "exceeds maximum identifier length",
    )
}

fn check_pubkey(value: &str, field: &str) -> Result<(), ValidationError> {
    capnet_crypto::decode_pubkey(value)
        .map(|_| ())
        .map_err(|e| ValidationError::field(field, e.to_string()))
}

// ── Capability documents ─────────────────────────────────────────

/// Validate (and normalize) a complete capability document.
///
/// Used both on the issuance path (the issuer re-validates its own
/// freshly signed output) and when judging externally supplied records.
pub fn validate_capability(cap: &mut Capability) -> Result<(), ValidationError> {
    require(
        cap.version == CAPDOC_VERSION,
        "version",
        "unsupported document version",
    )?;
    require(
        cap.cap_id.len() >= CAP_ID_MIN_LEN && cap.cap_id.len() <= CAP_ID_MAX_LEN,
        "cap_id",
        "must be 8-128 characters",
    )?;

    let issued = parse_timestamp(&cap.issued_at)
        .ok_or_else(|| ValidationError::field("issued_at", "not a valid RFC3339 timestamp"))?;
    let expires = parse_timestamp(&cap.expires_at)
        .ok_or_else(|| ValidationError::field("expires_at", "not a valid RFC3339 timestamp"))?;
    require(
        expires > issued,
        "expires_at",
        "must be after issued_at",
    )?;
    if let Some(nb) = &cap.not_before {
        let not_before = parse_timestamp(nb)
            .ok_or_else(|| ValidationError::field("not_before", "not a valid RFC3339 timestamp"))?;
        require(
            not_before <= expires,
            "not_before",
            "must be at or before expires_at",
        )?;
    }

    check_id(&cap.issuer.id, "issuer.id")?;
    check_pubkey(&cap.issuer.pubkey, "issuer.pubkey")?;
    check_id(&cap.subject.id, "subject.id")?;
    check_id(&cap.executor.agent_id, "executor.agent_id")?;
    check_pubkey(&cap.executor.agent_pubkey, "executor.agent_pubkey")?;

    cap.resource.vendor = normalize(&cap.resource.vendor);
    check_id(&cap.resource.vendor, "resource.vendor")?;

    require(!cap.actions.is_empty(), "actions", "must not be empty")?;

    match &mut cap.constraints {
        Constraints::Spend(c) => {
            require(
                cap.actions.contains(&Action::Spend),
                "constraints",
                "spend constraints require the spend action",
            )?;
            validate_spend_constraints(c)?;
            require(
                c.allowed_vendors.contains(&cap.resource.vendor),
                "resource.vendor",
                "must be one of constraints.allowed_vendors",
            )?;
        }
        Constraints::ToolCall(c) => {
            require(
                cap.actions.contains(&Action::ToolCall),
                "constraints",
                "tool_call constraints require the tool_call action",
            )?;
            validate_tool_call_constraints(c)?;
        }
    }

    check_id(&cap.revocation.oracle, "revocation.oracle")?;

    match &cap.proof {
        None => return Err(ValidationError::field("proof", "missing")),
        Some(proof) => {
            require(
                proof.alg == SIGNATURE_ALG,
                "proof.alg",
                "unsupported signature algorithm",
            )?;
            capnet_crypto::decode_signature(&proof.sig)
                .map_err(|e| ValidationError::field("proof.sig", e.to_string()))?;
        }
    }

    Ok(())
}

/// Validate (and normalize) spend constraints.
pub fn validate_spend_constraints(c: &mut SpendConstraints) -> Result<(), ValidationError> {
    require(
        c.currency == "USD",
        "constraints.spend.currency",
        "only USD is supported",
    )?;
    require(
        c.max_amount_cents >= 1 && c.max_amount_cents <= MAX_SAFE_AMOUNT,
        "constraints.spend.max_amount_cents",
        "must be a positive safe integer",
    )?;
    require(
        !c.allowed_vendors.is_empty(),
        "constraints.spend.allowed_vendors",
        "must not be empty",
    )?;
    require(
        c.allowed_vendors.len() <= MAX_LIST_LEN,
        "constraints.spend.allowed_vendors",
        "too many entries",
    )?;
    for (idx, vendor) in c.allowed_vendors.iter_mut().enumerate() {
        *vendor = normalize(vendor);
        require(
            !vendor.is_empty() && vendor.len() <= MAX_ID_LEN,
            &format!("constraints.spend.allowed_vendors[{}]", idx),
            "must be a non-empty vendor string",
        )?;
    }
    require(
        c.blocked_categories.len() <= MAX_LIST_LEN,
        "constraints.spend.blocked_categories",
        "too many entries",
    )?;
    for (idx, category) in c.blocked_categories.iter_mut().enumerate() {
        *category = normalize(category);
        require(
            !category.is_empty() && category.len() <= MAX_ID_LEN,
            &format!("constraints.spend.blocked_categories[{}]", idx),
            "must be a non-empty category string",
        )?;
    }
    Ok(())
}

/// Validate (and normalize) tool-call constraints.
pub fn validate_tool_call_constraints(c: &mut ToolCallConstraints) -> Result<(), ValidationError> {
    require(
        !c.allowed_tools.is_empty(),
        "constraints.tool_call.allowed_tools",
        "must not be empty",
    )?;
    require(
        c.allowed_tools.len() <= MAX_LIST_LEN,
        "constraints.tool_call.allowed_tools",
        "too many entries",
    )?;
    for (idx, tool) in c.allowed_tools.iter_mut().enumerate() {
        // Tool names keep their case; only surrounding whitespace is noise.
        *tool = tool.trim().to_string();
        require(
            !tool.is_empty() && tool.len() <= MAX_ID_LEN,
            &format!("constraints.tool_call.allowed_tools[{}]", idx),
            "must be a non-empty tool name",
        )?;
    }
    require(
        c.blocked_tool_categories.len() <= MAX_LIST_LEN,
        "constraints.tool_call.blocked_tool_categories",
        "too many entries",
    )?;
    for (idx, category) in c.blocked_tool_categories.iter_mut().enumerate() {
        *category = normalize(category);
        require(
            !category.is_empty() && category.len() <= MAX_ID_LEN,
            &format!("constraints.tool_call.blocked_tool_categories[{}]", idx),
            "must be a non-empty category string",
        )?;
    }
    if let Some(max_calls) = c.max_calls {
        require(
            max_calls >= 1,
            "constraints.tool_call.max_calls",
            "must be at least 1",
        )?;
    }
    Ok(())
}

// ── Action requests ──────────────────────────────────────────────

fn check_request_header(
    request_id: &str,
    ts: &str,
    agent_id: &str,
    agent_pubkey: &str,
) -> Result<(), ValidationError> {
    require(
        request_id.len() >= CAP_ID_MIN_LEN && request_id.len() <= CAP_ID_MAX_LEN,
        "request_id",
        "must be 8-128 characters",
    )?;
    parse_timestamp(ts)
        .ok_or_else(|| ValidationError::field("ts", "not a valid RFC3339 timestamp"))?;
    check_id(agent_id, "agent_id")?;
    check_pubkey(agent_pubkey, "agent_pubkey")
}

/// Validate (and normalize) a spend request.
pub fn validate_spend_request(req: &mut SpendRequest) -> Result<(), ValidationError> {
    check_request_header(&req.request_id, &req.ts, &req.agent_id, &req.agent_pubkey)?;
    require(
        req.action == Action::Spend,
        "action",
        "must be \"spend\"",
    )?;
    require(req.currency == "USD", "currency", "only USD is supported")?;

    req.vendor = normalize(&req.vendor);
    check_id(&req.vendor, "vendor")?;

    require(!req.cart.is_empty(), "cart", "must not be empty")?;
    require(
        req.cart.len() <= MAX_CART_LINES,
        "cart",
        "too many cart lines",
    )?;

    // The cumulative amount bound is NOT checked here: the enforcement
    // pipeline checks it after emitting ACTION_ATTEMPT, so overflow
    // attempts stay observable in the audit log.
    for (idx, line) in req.cart.iter_mut().enumerate() {
        if let Some(sku) = &line.sku {
            require(
                sku.len() <= MAX_ID_LEN,
                &format!("cart[{}].sku", idx),
                "exceeds maximum length",
            )?;
        }
        require(
            !line.name.trim().is_empty() && line.name.len() <= MAX_NAME_LEN,
            &format!("cart[{}].name", idx),
            "must be a non-empty name",
        )?;
        line.category = normalize(&line.category);
        require(
            !line.category.is_empty() && line.category.len() <= MAX_ID_LEN,
            &format!("cart[{}].category", idx),
            "must be a non-empty category string",
        )?;
        require(
            line.price_cents >= 1 && line.price_cents <= PRICE_CENTS_MAX,
            &format!("cart[{}].price_cents", idx),
            "must be between 1 and 5000000",
        )?;
        require(
            line.qty >= 1 && line.qty <= QTY_MAX,
            &format!("cart[{}].qty", idx),
            "must be between 1 and 1000",
        )?;
    }

    Ok(())
}

/// Validate (and normalize) a tool-call request.
pub fn validate_tool_call_request(req: &mut ToolCallRequest) -> Result<(), ValidationError> {
    check_request_header(&req.request_id, &req.ts, &req.agent_id, &req.agent_pubkey)?;
    require(
        req.action == Action::ToolCall,
        "action",
        "must be \"tool_call\"",
    )?;

    req.tool_name = req.tool_name.trim().to_string();
    require(
        !req.tool_name.is_empty() && req.tool_name.len() <= MAX_ID_LEN,
        "tool_name",
        "must be a non-empty tool name",
    )?;

    req.tool_category = normalize(&req.tool_category);
    require(
        !req.tool_category.is_empty() && req.tool_category.len() <= MAX_ID_LEN,
        "tool_category",
        "must be a non-empty category string",
    )?;

    require(
        req.tool_input.is_object(),
        "tool_input",
        "must be a JSON object",
    )?;
    let serialized = serde_json::to_vec(&req.tool_input)?;
    require(
        serialized.len() <= MAX_TOOL_INPUT_BYTES,
        "tool_input",
        "exceeds maximum serialized size",
    )?;

    Ok(())
}
