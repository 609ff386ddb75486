//! # capnet-store
//!
//! Crash-safe persistence for the capnet core.
//!
//! The store is the only I/O-bearing component below the transport. It
//! holds four artifacts in one data directory:
//!
//! - `capabilities.json` — the capability index, a record map
//! - `revocations.json` — the monotone revocation set, an array
//! - `issuer_keys.json` — the issuer keypair, written once
//! - `audit.jsonl` — the append-only receipt log
//!
//! Replace-whole artifacts are written via temp-file-then-rename, so a
//! crash mid-write leaves either the old snapshot or the new one, never
//! a torn file. A corrupt capability index or revocation file degrades
//! to empty-with-warning so the core can still issue fresh capabilities
//! after damage; corrupt issuer keys are a hard error because nothing
//! can be trusted without them.

pub mod atomic;
pub mod error;
pub mod keys;
pub mod store;

pub use atomic::write_json_atomic;
pub use error::StoreError;
pub use keys::IssuerKeys;
pub use store::{CapabilityStore, StoredCapability};
