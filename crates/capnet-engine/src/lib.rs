//! # capnet-engine
//!
//! The trust engine: issuance, enforcement, and revocation.
//!
//! [`CoreService`] is the single enforcement boundary. Every
//! side-effecting action an agent wants to take is evaluated here,
//! against the capability store, in a fixed verification order that
//! determines which denial reason surfaces when several defects are
//! present at once. Denials are ordinary outcomes carried in an
//! [`ActionResult`](capnet_schema::ActionResult); errors are reserved
//! for caller mistakes ([`ApiError`]) and server faults ([`CoreFault`]).
//!
//! ## Key invariants
//!
//! - **Default deny**: no matching capability, no action.
//! - **Signature first**: no field of a stored capability influences
//!   policy before its proof verifies against the embedded issuer key.
//! - **Every evaluation is audited**: ACTION_ATTEMPT before any lookup,
//!   then exactly one of ACTION_ALLOWED / ACTION_DENIED whose
//!   receipt_id is the one returned to the caller.

pub mod enforce;
pub mod error;
pub mod issuer;
mod receipts;
pub mod service;

pub use enforce::{evaluate_spend, evaluate_tool_call};
pub use error::{ApiError, CoreFault};
pub use issuer::{issue_spend, issue_tool_call, IssueSpendInput, IssueToolCallInput};
pub use service::CoreService;
