//! # capnet-schema
//!
//! Data model and validation boundary for capnet.
//!
//! Everything that crosses into the trust core — capability documents,
//! action requests, issuance inputs — is deserialized into the closed
//! types here (`deny_unknown_fields` everywhere) and then passed through
//! a validator that enforces bounds, base64 well-formedness, cross-field
//! constraints, and one-time normalization (trim + lowercase) of vendor
//! and category strings. Inside the enforcement engine, comparisons are
//! plain equality; if you find yourself normalizing there, the layering
//! is wrong.

pub mod capability;
pub mod decision;
pub mod error;
pub mod request;
pub mod validate;

pub use capability::{
    Action, Capability, Constraints, ExecutorRef, IssuerRef, Proof, Resource, ResourceType,
    RevocationMode, RevocationPolicy, SpendConstraints, SubjectRef, ToolCallConstraints,
    CAPDOC_VERSION, SIGNATURE_ALG,
};
pub use decision::{ActionResult, DecisionKind, DenyReason, ALLOWED_REASON};
pub use error::ValidationError;
pub use request::{CartLine, SpendRequest, ToolCallRequest, MAX_SAFE_AMOUNT};
pub use validate::{
    normalize, parse_timestamp, validate_capability, validate_spend_constraints,
    validate_spend_request, validate_tool_call_constraints, validate_tool_call_request,
};
