//! # capnet-audit
//!
//! Receipts and the append-only audit log.
//!
//! Every lifecycle and decision event in the core — capability issued,
//! capability revoked, action attempted, action allowed, action denied —
//! is recorded as a [`Receipt`] in a JSONL log file. Receipts are never
//! mutated or deleted; readers tolerate a truncated or garbled trailing
//! line by skipping it, so a crash mid-append can never make the log
//! unreadable.
//!
//! Each receipt the core emits carries an Ed25519 proof by the issuer
//! key over the proof-less body, signed under the `receipt` domain so
//! it can never be confused with a capability signature.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use capnet_audit::{AuditLog, Receipt, ReceiptEvent};
//!
//! let mut log = AuditLog::open("/tmp/audit.jsonl").unwrap();
//! let receipt = Receipt::new(ReceiptEvent::ActionAttempt)
//!     .with_request("req_1")
//!     .with_agent("agent:demo");
//! log.append(&receipt).unwrap();
//! ```

pub mod error;
pub mod log;
pub mod receipt;

pub use error::AuditError;
pub use log::AuditLog;
pub use receipt::{sign_receipt, verify_receipt, Receipt, ReceiptEvent, ReceiptSummary};
