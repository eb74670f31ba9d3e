//! Error types for field validation

use thiserror::Error;

use crate::types::FieldKind;

/// Result type for field operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while validating or rendering a field value
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldsError {
    /// The raw value cannot be coerced by the field's rules
    #[error("invalid {kind} value '{value}': {reason}")]
    Validation {
        kind: FieldKind,
        value: String,
        reason: String,
    },

    /// The field kind has no built-in coercion and none was attached
    #[error("{kind} field has no coercion; attach one with `with_coercion`")]
    CoercionNotImplemented { kind: FieldKind },
}

impl FieldsError {
    pub(crate) fn validation(
        kind: FieldKind,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        FieldsError::Validation {
            kind,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
