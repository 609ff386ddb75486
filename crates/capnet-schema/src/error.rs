// error.rs — Validation error types.

use thiserror::Error;

/// Rejection of an external input at the schema boundary.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field failed a bound, format, or cross-field constraint.
    /// `field` is a dotted path into the offending input.
    #[error("invalid input at '{field}': {message}")]
    Field { field: String, message: String },

    /// The input could not be serialized for inspection.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ValidationError {
    /// Shorthand for a field-level rejection.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field: field.into(),
            message: message.into(),
        }
    }
}
