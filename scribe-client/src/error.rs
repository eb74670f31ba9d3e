//! Error types for the record registry and line codec

use std::path::PathBuf;

use scribe_fields::FieldsError;
use thiserror::Error;

/// Result type for scribe client operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Errors that can occur while defining, registering, encoding or parsing records
#[derive(Debug, Error)]
pub enum ScribeError {
    /// A record type was built without an entity tag
    #[error("record type has no entity tag")]
    EntityNotDefined,

    /// The entity tag is already bound to a different record type
    #[error("entity '{entity}' is already registered to a different record type")]
    EntityConflict { entity: String },

    /// A record type has no fields after merging its ancestors
    #[error("record type '{entity}' declares no fields")]
    NoFieldsDefined { entity: String },

    /// `orders` names a field the record type does not declare
    #[error("order key '{field}' is not a field of '{entity}'")]
    InvalidOrder { entity: String, field: String },

    /// No record type is registered under the entity tag
    #[error("entity '{entity}' has not been registered")]
    UnknownEntity { entity: String },

    /// A line does not have the expected column layout
    #[error("malformed line at column {column}: {reason}")]
    MalformedLine { column: usize, reason: String },

    /// The write timestamp column could not be parsed
    #[error("invalid write timestamp '{value}'")]
    InvalidTimestamp { value: String },

    /// A setter named a field the record type does not declare
    #[error("'{field}' is not a field of '{entity}'")]
    UnknownField { entity: String, field: String },

    /// A field value failed validation
    #[error("field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: FieldsError,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScribeError {
    pub(crate) fn field(field: &str, source: FieldsError) -> Self {
        ScribeError::Field {
            field: field.to_string(),
            source,
        }
    }

    /// The underlying field validation error, if this is one.
    pub fn as_field_error(&self) -> Option<&FieldsError> {
        match self {
            ScribeError::Field { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Configuration parsing failed
    #[error("Failed to parse configuration: {source}")]
    ParseError { source: Box<figment::Error> },

    /// Invalid configuration value
    #[error("Invalid configuration value for key '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::ParseError {
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_fields::FieldKind;

    #[test]
    fn test_error_display() {
        let err = ScribeError::InvalidOrder {
            entity: "demo.dog".into(),
            field: "tail".into(),
        };
        assert_eq!(err.to_string(), "order key 'tail' is not a field of 'demo.dog'");
    }

    #[test]
    fn test_field_error_keeps_source() {
        let err = ScribeError::field(
            "legs",
            FieldsError::CoercionNotImplemented {
                kind: FieldKind::Float,
            },
        );
        assert!(err.to_string().starts_with("field 'legs':"));
        assert!(err.as_field_error().is_some());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_config_error_converts() {
        let err: ScribeError = ConfigError::InvalidValue {
            key: "port".into(),
            message: "must not be zero".into(),
        }
        .into();
        assert!(err.to_string().contains("port"));
    }
}
