//! Conversion error types shared across the broker.

use thiserror::Error;

/// Error raised by the identity/attribute type subsystems while converting
/// a raw remote value to its locally declared form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    /// Value is present but does not parse as the declared value type.
    #[error("invalid value for type '{type_name}': {message}")]
    InvalidValueForType {
        /// Declared attribute or identity type name.
        type_name: String,
        /// Description of the failure.
        message: String,
    },

    /// The referenced type is not declared at all.
    #[error("unknown type: {type_name}")]
    UnknownType {
        /// The unresolvable type name.
        type_name: String,
    },
}

impl ConversionError {
    /// Create an invalid-value error.
    pub fn invalid_value(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ConversionError::InvalidValueForType {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-type error.
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        ConversionError::UnknownType {
            type_name: type_name.into(),
        }
    }
}

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConversionError::invalid_value("email", "missing '@'");
        assert_eq!(err.to_string(), "invalid value for type 'email': missing '@'");

        let err = ConversionError::unknown_type("x-ghost");
        assert_eq!(err.to_string(), "unknown type: x-ghost");
    }
}
