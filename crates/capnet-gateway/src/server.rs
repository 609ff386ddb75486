// server.rs — MCP gateway server for the capnet core.
//
// CapnetGatewayServer implements the rmcp ServerHandler trait, exposing
// the trust engine's operations as MCP tools. Every tool call flows
// through schema validation → enforcement → audit; the gateway itself
// never makes a policy decision.
//
// Tools (prefixed `capnet_` for namespacing):
//   capnet_health             — liveness + issuer identity
//   capnet_issue_spend        — mint a spend capability
//   capnet_issue_tool_call    — mint a tool-call capability
//   capnet_enforce_spend      — evaluate a spend request
//   capnet_enforce_tool_call  — evaluate a tool-call request
//   capnet_revoke             — revoke a capability by id
//   capnet_list_capabilities  — all capabilities, tagged is_revoked
//   capnet_list_receipts      — tail of the audit log

use std::sync::{Arc, Mutex};

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use capnet_engine::{ApiError, CoreService, IssueSpendInput, IssueToolCallInput};
use capnet_schema::{
    Action, CartLine, SpendConstraints, SpendRequest, ToolCallConstraints, ToolCallRequest,
};

use crate::config::CapnetConfig;
use crate::error::GatewayError;

// ── Tool parameter types ─────────────────────────────────────────

fn default_currency() -> String {
    "USD".to_string()
}

/// Spend constraints as supplied by callers.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SpendConstraintsParams {
    /// ISO currency code. Only "USD" is accepted.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Budget ceiling in integer cents.
    pub max_amount_cents: u64,
    /// Vendors the capability may spend at (first entry becomes the
    /// pinned resource vendor).
    pub allowed_vendors: Vec<String>,
    /// Categories that must never appear in a cart.
    #[serde(default)]
    pub blocked_categories: Vec<String>,
}

impl From<SpendConstraintsParams> for SpendConstraints {
    fn from(p: SpendConstraintsParams) -> Self {
        SpendConstraints {
            currency: p.currency,
            max_amount_cents: p.max_amount_cents,
            allowed_vendors: p.allowed_vendors,
            blocked_categories: p.blocked_categories,
        }
    }
}

/// Tool-call constraints as supplied by callers.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ToolCallConstraintsParams {
    /// Tool names the capability may invoke.
    pub allowed_tools: Vec<String>,
    /// Category tags that must never be invoked.
    #[serde(default)]
    pub blocked_tool_categories: Vec<String>,
    /// Reserved: admitted by the schema, not yet enforced.
    #[serde(default)]
    pub max_calls: Option<u64>,
}

impl From<ToolCallConstraintsParams> for ToolCallConstraints {
    fn from(p: ToolCallConstraintsParams) -> Self {
        ToolCallConstraints {
            allowed_tools: p.allowed_tools,
            blocked_tool_categories: p.blocked_tool_categories,
            max_calls: p.max_calls,
        }
    }
}

/// Parameters for `capnet_issue_spend`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IssueSpendParams {
    /// Template tag recorded on the issuance receipt.
    pub template: String,
    /// Agent identity the capability is bound to.
    pub agent_id: String,
    /// Base64 Ed25519 verifying key of the agent.
    pub agent_pubkey: String,
    /// Principal on whose behalf authority is delegated.
    #[serde(default)]
    pub subject_id: Option<String>,
    pub constraints: SpendConstraintsParams,
}

/// Parameters for `capnet_issue_tool_call`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IssueToolCallParams {
    /// Template tag recorded on the issuance receipt.
    pub template: String,
    /// Agent identity the capability is bound to.
    pub agent_id: String,
    /// Base64 Ed25519 verifying key of the agent.
    pub agent_pubkey: String,
    /// Principal on whose behalf authority is delegated.
    #[serde(default)]
    pub subject_id: Option<String>,
    pub constraints: ToolCallConstraintsParams,
}

/// One cart line of a spend request.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CartLineParams {
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    pub category: String,
    /// Unit price in integer cents.
    pub price_cents: u64,
    pub qty: u32,
}

/// Parameters for `capnet_enforce_spend`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EnforceSpendParams {
    pub request_id: String,
    /// RFC3339 timestamp of the request.
    pub ts: String,
    pub agent_id: String,
    pub agent_pubkey: String,
    pub vendor: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub cart: Vec<CartLineParams>,
}

/// Parameters for `capnet_enforce_tool_call`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EnforceToolCallParams {
    pub request_id: String,
    /// RFC3339 timestamp of the request.
    pub ts: String,
    pub agent_id: String,
    pub agent_pubkey: String,
    pub tool_name: String,
    pub tool_category: String,
    /// Free-form JSON object handed to the tool.
    pub tool_input: serde_json::Value,
}

/// Parameters for `capnet_revoke`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RevokeParams {
    /// The capability to revoke.
    pub cap_id: String,
}

/// Parameters for `capnet_list_receipts`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListReceiptsParams {
    /// Keep only the newest N receipts.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Keep only receipts at or after this RFC3339 timestamp.
    #[serde(default)]
    pub since: Option<String>,
}

// ── MCP Server ───────────────────────────────────────────────────

/// The MCP gateway server. Holds the core behind a mutex (single-writer
/// discipline) and the tool router.
pub struct CapnetGatewayServer {
    config: CapnetConfig,
    state: Arc<Mutex<CoreService>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CapnetGatewayServer {
    /// Create a new gateway server from config.
    pub fn new(config: CapnetConfig) -> Result<Self, GatewayError> {
        let core = CoreService::open(&config.data_dir)?;
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(core)),
            tool_router: Self::tool_router(),
        })
    }

    /// Get a reference to the shared core (for testing).
    pub fn state(&self) -> &Arc<Mutex<CoreService>> {
        &self.state
    }

    fn core(&self) -> Result<std::sync::MutexGuard<'_, CoreService>, McpError> {
        self.state
            .lock()
            .map_err(|e| McpError::internal_error(format!("lock poisoned: {}", e), None))
    }

    /// Reject oversized bodies before any validation work.
    fn check_body_size<T: Serialize>(&self, params: &T) -> Result<(), McpError> {
        let size = serde_json::to_vec(params)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?
            .len();
        if size > self.config.max_body_bytes {
            return Err(McpError::invalid_params(
                format!(
                    "request body of {} bytes exceeds the {} byte limit",
                    size, self.config.max_body_bytes
                ),
                None,
            ));
        }
        Ok(())
    }

    #[tool(description = "Liveness check. Returns issuer identity and capability count.")]
    fn capnet_health(&self) -> Result<CallToolResult, McpError> {
        let core = self.core()?;
        Ok(CallToolResult::success(vec![Content::json(core.health())
            .map_err(|e| McpError::internal_error(e.to_string(), None))?]))
    }

    #[tool(
        description = "Issue a signed spend capability bound to an agent. Valid for 24 hours; vendor is pinned to the first allowed vendor."
    )]
    fn capnet_issue_spend(
        &self,
        Parameters(params): Parameters<IssueSpendParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_body_size(&params)?;
        let mut core = self.core()?;
        let cap = core
            .issue_spend_capability(IssueSpendInput {
                template: params.template,
                agent_id: params.agent_id,
                agent_pubkey: params.agent_pubkey,
                subject_id: params.subject_id,
                constraints: params.constraints.into(),
            })
            .map_err(map_api_error)?;
        json_result(&cap)
    }

    #[tool(
        description = "Issue a signed tool-call capability bound to an agent. Valid for 24 hours."
    )]
    fn capnet_issue_tool_call(
        &self,
        Parameters(params): Parameters<IssueToolCallParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_body_size(&params)?;
        let mut core = self.core()?;
        let cap = core
            .issue_tool_call_capability(IssueToolCallInput {
                template: params.template,
                agent_id: params.agent_id,
                agent_pubkey: params.agent_pubkey,
                subject_id: params.subject_id,
                constraints: params.constraints.into(),
            })
            .map_err(map_api_error)?;
        json_result(&cap)
    }

    #[tool(
        description = "Evaluate a spend request against the agent's capability. Returns {decision, reason, receipt_id}; denials are normal outcomes, not errors."
    )]
    fn capnet_enforce_spend(
        &self,
        Parameters(params): Parameters<EnforceSpendParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_body_size(&params)?;
        let mut core = self.core()?;
        let result = core
            .enforce_spend(SpendRequest {
                request_id: params.request_id,
                ts: params.ts,
                agent_id: params.agent_id,
                agent_pubkey: params.agent_pubkey,
                action: Action::Spend,
                vendor: params.vendor,
                currency: params.currency,
                cart: params
                    .cart
                    .into_iter()
                    .map(|line| CartLine {
                        sku: line.sku,
                        name: line.name,
                        category: line.category,
                        price_cents: line.price_cents,
                        qty: line.qty,
                    })
                    .collect(),
            })
            .map_err(map_api_error)?;
        json_result(&result)
    }

    #[tool(
        description = "Evaluate a tool-call request against the agent's capability. Returns {decision, reason, receipt_id}."
    )]
    fn capnet_enforce_tool_call(
        &self,
        Parameters(params): Parameters<EnforceToolCallParams>,
    ) -> Result<CallToolResult, McpError> {
        self.check_body_size(&params)?;
        let mut core = self.core()?;
        let result = core
            .enforce_tool_call(ToolCallRequest {
                request_id: params.request_id,
                ts: params.ts,
                agent_id: params.agent_id,
                agent_pubkey: params.agent_pubkey,
                action: Action::ToolCall,
                tool_name: params.tool_name,
                tool_category: params.tool_category,
                tool_input: params.tool_input,
            })
            .map_err(map_api_error)?;
        json_result(&result)
    }

    #[tool(
        description = "Revoke a capability by id. Irreversible; every later action citing it is denied with REVOKED."
    )]
    fn capnet_revoke(
        &self,
        Parameters(params): Parameters<RevokeParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut core = self.core()?;
        let receipt = core.revoke(&params.cap_id).map_err(map_api_error)?;
        json_result(&serde_json::json!({
            "cap_id": params.cap_id,
            "revoked": true,
            "receipt_id": receipt.receipt_id,
        }))
    }

    #[tool(description = "List all capabilities, each tagged with is_revoked.")]
    fn capnet_list_capabilities(&self) -> Result<CallToolResult, McpError> {
        let core = self.core()?;
        let caps = core.list_capabilities();
        let count = caps.len();
        json_result(&serde_json::json!({
            "capabilities": caps,
            "count": count,
        }))
    }

    #[tool(description = "List audit receipts, optionally bounded by limit and a since timestamp.")]
    fn capnet_list_receipts(
        &self,
        Parameters(params): Parameters<ListReceiptsParams>,
    ) -> Result<CallToolResult, McpError> {
        let since = match &params.since {
            None => None,
            Some(raw) => Some(capnet_schema::parse_timestamp(raw).ok_or_else(|| {
                McpError::invalid_params(
                    format!("INVALID_INPUT: since '{}' is not RFC3339", raw),
                    None,
                )
            })?),
        };
        let core = self.core()?;
        let receipts = core.list_receipts(params.limit, since).map_err(map_api_error)?;
        let count = receipts.len();
        json_result(&serde_json::json!({
            "receipts": receipts,
            "count": count,
        }))
    }
}

// ── ServerHandler implementation ─────────────────────────────────

#[tool_handler]
impl ServerHandler for CapnetGatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "capnet".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Capnet".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Capnet capability enforcement core. Issue scoped, signed, \
                 time-bounded capabilities with capnet_issue_spend / \
                 capnet_issue_tool_call, evaluate agent actions with \
                 capnet_enforce_spend / capnet_enforce_tool_call, and kill \
                 delegated authority with capnet_revoke. Every decision is \
                 recorded in the append-only audit log (capnet_list_receipts)."
                    .into(),
            ),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_value(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::json(json)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?]))
}

/// Map the core's error taxonomy onto MCP errors. Caller faults carry
/// their detail; server faults are logged here and cross the wire as an
/// opaque code.
fn map_api_error(err: ApiError) -> McpError {
    if err.is_server_fault() {
        tracing::error!(error = %err, code = err.code(), "core fault");
        McpError::internal_error(err.code(), None)
    } else {
        McpError::invalid_params(format!("{}: {}", err.code(), err), None)
    }
}
