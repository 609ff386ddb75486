//! # capnet-canonical
//!
//! Deterministic, domain-separated serialization for capnet artifacts.
//!
//! Every signature in capnet is computed over the output of
//! [`canonicalize`]: an ASCII domain prefix followed by a stable JSON
//! rendering of the value (object keys sorted byte-wise at every depth,
//! arrays in order, no insignificant whitespace, UTF-8). Two deep-equal
//! values always canonicalize to the same bytes, so a document can be
//! deserialized and reserialized anywhere without breaking its signature.
//!
//! The domain prefix ties a signature to one artifact class. A signature
//! over a receipt can never verify as a signature over a capability
//! document, because the signed bytes start with a different prefix.
//!
//! ## Quick Example
//!
//! ```rust
//! use capnet_canonical::{canonicalize, Domain};
//!
//! let value = serde_json::json!({"b": 1, "a": 2});
//! let bytes = canonicalize(Domain::Capdoc, &value).unwrap();
//! assert_eq!(bytes, b"capnet:capdoc/0.1:{\"a\":2,\"b\":1}");
//! ```

pub mod canonicalizer;
pub mod domain;

pub use canonicalizer::{canonicalize, stable_json, CanonicalError, MAX_SAFE_INTEGER};
pub use domain::Domain;
