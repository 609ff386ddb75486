// error.rs — The three-way error taxonomy.
//
// Denial reasons never appear here: they are values inside an
// ActionResult. ApiError covers caller faults (4xx-equivalent),
// CoreFault covers server faults (5xx-equivalent). Transports map
// ApiError codes onto their own error shapes; CoreFault details are
// logged and only the code crosses the wire.

use thiserror::Error;

use capnet_schema::ValidationError;
use capnet_store::StoreError;

/// Server-side faults. Logged in full; surfaced to callers as an opaque
/// code.
#[derive(Debug, Error)]
pub enum CoreFault {
    /// Internal construction produced a document our own schema rejects.
    #[error("capability construction produced an invalid document: {0}")]
    CapdocSchema(ValidationError),

    /// A freshly produced signature failed self-verification, or
    /// signing itself failed.
    #[error("signing failure: {0}")]
    Signing(String),

    /// Disk I/O failed unrecoverably.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreFault {
    /// The opaque wire code for this fault.
    pub fn code(&self) -> &'static str {
        match self {
            CoreFault::CapdocSchema(_) => "CAPDOC_SCHEMA_FAILURE",
            CoreFault::Signing(_) => "SIGNING_FAILURE",
            CoreFault::Store(_) => "STORE_ERROR",
        }
    }
}

/// Errors returned from the public operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The input failed schema validation. Carries the field path.
    #[error("invalid input: {0}")]
    InvalidInput(ValidationError),

    /// The cumulative cart amount left the safe integer range. A
    /// malformed request, not a policy denial.
    #[error("cart total exceeds the safe integer range")]
    AmountOverflow,

    /// Revocation target does not exist in the capability index.
    #[error("capability not found: {0}")]
    CapNotFound(String),

    /// Revocation target was already revoked.
    #[error("capability already revoked: {0}")]
    AlreadyRevoked(String),

    /// A server fault occurred while handling the request.
    #[error(transparent)]
    Fault(#[from] CoreFault),
}

impl ApiError {
    /// The machine-readable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::AmountOverflow => "AMOUNT_OVERFLOW",
            ApiError::CapNotFound(_) => "CAP_NOT_FOUND",
            ApiError::AlreadyRevoked(_) => "ALREADY_REVOKED",
            ApiError::Fault(fault) => fault.code(),
        }
    }

    /// Whether this is a server fault (5xx-equivalent) rather than a
    /// caller fault (4xx-equivalent).
    pub fn is_server_fault(&self) -> bool {
        matches!(self, ApiError::Fault(_))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::InvalidInput(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Fault(CoreFault::Store(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_wire_vocabulary() {
        assert_eq!(
            ApiError::InvalidInput(ValidationError::field("x", "bad")).code(),
            "INVALID_INPUT"
        );
        assert_eq!(ApiError::AmountOverflow.code(), "AMOUNT_OVERFLOW");
        assert_eq!(ApiError::CapNotFound("cap_x".into()).code(), "CAP_NOT_FOUND");
        assert_eq!(
            ApiError::AlreadyRevoked("cap_x".into()).code(),
            "ALREADY_REVOKED"
        );
        assert_eq!(
            ApiError::Fault(CoreFault::Signing("self-check".into())).code(),
            "SIGNING_FAILURE"
        );
    }

    #[test]
    fn fault_classification() {
        assert!(!ApiError::AmountOverflow.is_server_fault());
        assert!(ApiError::Fault(CoreFault::Signing("x".into())).is_server_fault());
    }
}
