// service.rs — CoreService: the public face of the trust engine.
//
// Owns the store and the issuer keys and exposes the eight public
// operations. Transports wrap one CoreService in a mutex (single-writer
// discipline): issuance, enforcement, and revocation all mutate the
// store, and serializing them keeps the audit log a linear extension of
// real-time order.

use chrono::{DateTime, Utc};
use std::path::Path;

use capnet_audit::{Receipt, ReceiptEvent};
use capnet_schema::{
    validate_spend_request, validate_tool_call_request, ActionResult, Capability, SpendRequest,
    ToolCallRequest,
};
use capnet_store::{CapabilityStore, IssuerKeys, StoredCapability, StoreError};

use crate::enforce::{evaluate_spend, evaluate_tool_call};
use crate::error::ApiError;
use crate::issuer::{issue_spend, issue_tool_call, IssueSpendInput, IssueToolCallInput};
use crate::receipts::emit;

/// The capability enforcement core.
pub struct CoreService {
    store: CapabilityStore,
    keys: IssuerKeys,
}

impl CoreService {
    /// Open (or initialize) the core in `data_dir`. Loads the issuer
    /// keypair, generating one on first start.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = CapabilityStore::open(data_dir)?;
        let keys = IssuerKeys::load_or_generate(&store.issuer_keys_path())?;
        Ok(Self { store, keys })
    }

    /// Liveness and identity summary.
    pub fn health(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "ok",
            "issuer_id": self.keys.issuer_id(),
            "issuer_key_fingerprint": capnet_crypto::fingerprint(&self.keys.public_key_b64()),
            "capabilities": self.store.list_capabilities().len(),
        })
    }

    /// The issuer's base64 verifying key, for receipt verification.
    pub fn issuer_public_key(&self) -> String {
        self.keys.public_key_b64()
    }

    /// Issue a spend capability.
    pub fn issue_spend_capability(
        &mut self,
        input: IssueSpendInput,
    ) -> Result<Capability, ApiError> {
        issue_spend(&mut self.store, &self.keys, input, Utc::now())
    }

    /// Issue a tool-call capability.
    pub fn issue_tool_call_capability(
        &mut self,
        input: IssueToolCallInput,
    ) -> Result<Capability, ApiError> {
        issue_tool_call(&mut self.store, &self.keys, input, Utc::now())
    }

    /// Validate and evaluate a spend request.
    pub fn enforce_spend(&mut self, mut req: SpendRequest) -> Result<ActionResult, ApiError> {
        validate_spend_request(&mut req)?;
        evaluate_spend(&mut self.store, &self.keys, &req, Utc::now())
    }

    /// Validate and evaluate a tool-call request.
    pub fn enforce_tool_call(
        &mut self,
        mut req: ToolCallRequest,
    ) -> Result<ActionResult, ApiError> {
        validate_tool_call_request(&mut req)?;
        evaluate_tool_call(&mut self.store, &self.keys, &req, Utc::now())
    }

    /// Revoke a capability. Monotone: once revoked, revoked forever.
    pub fn revoke(&mut self, cap_id: &str) -> Result<Receipt, ApiError> {
        let agent_id = match self.store.capability(cap_id) {
            None => return Err(ApiError::CapNotFound(cap_id.to_string())),
            Some(cap) => cap.executor.agent_id.clone(),
        };
        if self.store.is_revoked(cap_id) {
            return Err(ApiError::AlreadyRevoked(cap_id.to_string()));
        }

        self.store.revoke(cap_id)?;
        let receipt = emit(
            &mut self.store,
            &self.keys,
            Receipt::new(ReceiptEvent::CapRevoked)
                .with_cap(cap_id)
                .with_agent(&agent_id),
        )?;
        tracing::info!(cap_id, agent_id = %agent_id, "capability revoked");
        Ok(receipt)
    }

    /// All capabilities with their revocation flags.
    pub fn list_capabilities(&self) -> Vec<StoredCapability> {
        self.store.list_capabilities()
    }

    /// Receipts from the audit log, newest `limit` at or after `since`.
    pub fn list_receipts(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Receipt>, ApiError> {
        Ok(self.store.read_receipts(limit, since)?)
    }
}
