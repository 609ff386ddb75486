// issuer.rs — Capability issuance.
//
// Issuance is construct → sign → re-validate → self-verify → persist →
// receipt. The re-validation catches drift between construction and the
// schema; the self-verification catches a broken signing path. Both are
// server faults when they fire: the caller did nothing wrong.
//
// Only spend and tool_call capabilities are ever minted. The schema
// admits sandbox_merchant and generic resource types for externally
// stored documents, but this issuer has no template for them; refusing
// is explicit rather than implied.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use uuid::Uuid;

use capnet_audit::{Receipt, ReceiptEvent};
use capnet_canonical::Domain;
use capnet_crypto::{sign_value, verify_value};
use capnet_schema::{
    validate_capability, validate_spend_constraints, validate_tool_call_constraints, Action,
    Capability, Constraints, ExecutorRef, IssuerRef, Proof, Resource, ResourceType,
    RevocationMode, RevocationPolicy, SpendConstraints, SubjectRef, ToolCallConstraints,
    ValidationError, CAPDOC_VERSION, SIGNATURE_ALG,
};
use capnet_store::{CapabilityStore, IssuerKeys};

use crate::error::{ApiError, CoreFault};
use crate::receipts::emit;

/// How long a freshly minted capability is valid.
const CAP_VALIDITY_HOURS: i64 = 24;

/// Subject recorded when the caller does not name one.
const DEFAULT_SUBJECT: &str = "user:local";

/// Vendor string recorded on tool-call capabilities; enforcement never
/// reads it for tool calls.
const TOOL_CALL_VENDOR: &str = "local";

/// Input to `issue_spend`.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueSpendInput {
    /// Free-form template tag, recorded on the issuance receipt.
    pub template: String,
    pub agent_id: String,
    pub agent_pubkey: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    pub constraints: SpendConstraints,
}

/// Input to `issue_tool_call`.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueToolCallInput {
    /// Free-form template tag, recorded on the issuance receipt.
    pub template: String,
    pub agent_id: String,
    pub agent_pubkey: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    pub constraints: ToolCallConstraints,
}

fn check_issue_header(
    template: &str,
    agent_id: &str,
    agent_pubkey: &str,
    subject_id: &Option<String>,
) -> Result<(), ValidationError> {
    if template.trim().is_empty() || template.len() > 64 {
        return Err(ValidationError::field("template", "must be 1-64 characters"));
    }
    if agent_id.trim().is_empty() || agent_id.len() > 128 {
        return Err(ValidationError::field("agent_id", "must be 1-128 characters"));
    }
    capnet_crypto::decode_pubkey(agent_pubkey)
        .map_err(|e| ValidationError::field("agent_pubkey", e.to_string()))?;
    if let Some(subject) = subject_id {
        if subject.trim().is_empty() || subject.len() > 128 {
            return Err(ValidationError::field("subject_id", "must be 1-128 characters"));
        }
    }
    Ok(())
}

fn new_cap_id() -> String {
    format!("cap_{}", Uuid::new_v4().simple())
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Issue a spend capability bound to the given agent.
pub fn issue_spend(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    mut input: IssueSpendInput,
    now: DateTime<Utc>,
) -> Result<Capability, ApiError> {
    check_issue_header(
        &input.template,
        &input.agent_id,
        &input.agent_pubkey,
        &input.subject_id,
    )
    .map_err(ApiError::InvalidInput)?;
    validate_spend_constraints(&mut input.constraints).map_err(ApiError::InvalidInput)?;

    let max_amount_cents = input.constraints.max_amount_cents;
    // Vendor is pinned to the first allowed vendor; allowed_vendors is
    // non-empty after validation.
    let vendor = input.constraints.allowed_vendors[0].clone();

    let cap = Capability {
        version: CAPDOC_VERSION.to_string(),
        cap_id: new_cap_id(),
        issued_at: rfc3339(now),
        expires_at: rfc3339(now + Duration::hours(CAP_VALIDITY_HOURS)),
        not_before: None,
        issuer: IssuerRef {
            id: keys.issuer_id().to_string(),
            pubkey: keys.public_key_b64(),
        },
        subject: SubjectRef {
            id: input
                .subject_id
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        },
        executor: ExecutorRef {
            agent_id: input.agent_id.clone(),
            agent_pubkey: input.agent_pubkey.clone(),
        },
        resource: Resource {
            kind: ResourceType::Spend,
            vendor,
        },
        actions: vec![Action::Spend],
        constraints: Constraints::Spend(input.constraints),
        revocation: RevocationPolicy {
            mode: RevocationMode::Strict,
            oracle: "local".to_string(),
        },
        proof: None,
    };

    let cap = sign_and_persist(store, keys, cap)?;

    emit(
        store,
        keys,
        Receipt::new(ReceiptEvent::CapIssued)
            .with_cap(&cap.cap_id)
            .with_agent(&cap.executor.agent_id)
            .with_meta(serde_json::json!({
                "template": input.template,
                "max_amount_cents": max_amount_cents,
            })),
    )?;

    Ok(cap)
}

/// Issue a tool-call capability bound to the given agent.
pub fn issue_tool_call(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    mut input: IssueToolCallInput,
    now: DateTime<Utc>,
) -> Result<Capability, ApiError> {
    check_issue_header(
        &input.template,
        &input.agent_id,
        &input.agent_pubkey,
        &input.subject_id,
    )
    .map_err(ApiError::InvalidInput)?;
    validate_tool_call_constraints(&mut input.constraints).map_err(ApiError::InvalidInput)?;

    let tool_count = input.constraints.allowed_tools.len();

    let cap = Capability {
        version: CAPDOC_VERSION.to_string(),
        cap_id: new_cap_id(),
        issued_at: rfc3339(now),
        expires_at: rfc3339(now + Duration::hours(CAP_VALIDITY_HOURS)),
        not_before: None,
        issuer: IssuerRef {
            id: keys.issuer_id().to_string(),
            pubkey: keys.public_key_b64(),
        },
        subject: SubjectRef {
            id: input
                .subject_id
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        },
        executor: ExecutorRef {
            agent_id: input.agent_id.clone(),
            agent_pubkey: input.agent_pubkey.clone(),
        },
        resource: Resource {
            kind: ResourceType::ToolCall,
            vendor: TOOL_CALL_VENDOR.to_string(),
        },
        actions: vec![Action::ToolCall],
        constraints: Constraints::ToolCall(input.constraints),
        revocation: RevocationPolicy {
            mode: RevocationMode::Strict,
            oracle: "local".to_string(),
        },
        proof: None,
    };

    let cap = sign_and_persist(store, keys, cap)?;

    emit(
        store,
        keys,
        Receipt::new(ReceiptEvent::CapIssued)
            .with_cap(&cap.cap_id)
            .with_agent(&cap.executor.agent_id)
            .with_meta(serde_json::json!({
                "template": input.template,
                "allowed_tool_count": tool_count,
            })),
    )?;

    Ok(cap)
}

/// Sign the proof-less body, re-validate the signed record, self-verify
/// the fresh signature, and persist.
fn sign_and_persist(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    mut cap: Capability,
) -> Result<Capability, ApiError> {
    let body = cap
        .unsigned_value()
        .map_err(|e| CoreFault::Signing(e.to_string()))?;
    let sig = sign_value(&body, keys.signing_key(), Domain::Capdoc)
        .map_err(|e| CoreFault::Signing(e.to_string()))?;
    cap.proof = Some(Proof {
        alg: SIGNATURE_ALG.to_string(),
        sig,
    });

    // Defense against drift between construction and the validator.
    validate_capability(&mut cap).map_err(CoreFault::CapdocSchema)?;

    // Defense against a broken signing path.
    let body = cap
        .unsigned_value()
        .map_err(|e| CoreFault::Signing(e.to_string()))?;
    let proof = cap.proof.as_ref().ok_or_else(|| {
        CoreFault::Signing("proof missing after signing".to_string())
    })?;
    let verified = verify_value(&body, &proof.sig, &cap.issuer.pubkey, Domain::Capdoc)
        .map_err(|e| CoreFault::Signing(e.to_string()))?;
    if !verified {
        return Err(CoreFault::Signing("self-verification failed".to_string()).into());
    }

    store.insert_capability(cap.clone()).map_err(CoreFault::Store)?;
    Ok(cap)
}
