//! Engine error types.
//!
//! Two families, matching when they can occur: [`LoadError`] is fatal at
//! profile save/load time and means the profile cannot be used;
//! [`EvalError`] occurs while running a loaded profile against one
//! assertion. The break signal is deliberately *not* an error; see
//! [`crate::action::ActionOutcome`].

use fedgate_core::ConversionError;
use thiserror::Error;

/// Fatal error while loading or validating a profile document.
///
/// Surfaced to the administrator; a profile that fails to load is never
/// executed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document tree itself is malformed.
    #[error("malformed profile document: {message}")]
    MalformedDocument { message: String },

    /// No factory is registered under the action name.
    #[error("unknown {direction} action type: {name}")]
    UnknownActionType { name: String, direction: String },

    /// Wrong number of raw parameters for the action.
    #[error("action '{action}' expects {expected} parameters, got {actual}")]
    InvalidParameterCount {
        action: String,
        expected: usize,
        actual: usize,
    },

    /// A parameter does not parse per its declared slot type.
    #[error("invalid value for parameter '{parameter}' of action '{action}': {message}")]
    InvalidParameterValue {
        action: String,
        parameter: String,
        message: String,
    },

    /// A condition or value expression does not compile.
    #[error("expression '{expression}' does not compile: {message}")]
    ExpressionCompile { expression: String, message: String },

    /// An action of one direction was used in a profile of the other.
    #[error("action '{action}' is an {actual} action, profile is {expected}")]
    IncompatibleActionType {
        action: String,
        expected: String,
        actual: String,
    },

    /// An identity-type parameter references an undeclared type.
    #[error("unknown identity type: {name}")]
    UnknownIdentityType { name: String },

    /// An attribute-type parameter references an undeclared type.
    #[error("unknown attribute type: {name}")]
    UnknownAttributeType { name: String },
}

impl LoadError {
    /// Create a malformed-document error.
    pub fn malformed(message: impl Into<String>) -> Self {
        LoadError::MalformedDocument {
            message: message.into(),
        }
    }
}

/// Result type for profile loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error while evaluating a condition or invoking an action at run time.
#[derive(Debug, Error)]
pub enum EvalError {
    /// An expression referenced a binding (variable or map key) that is
    /// not defined in the context.
    #[error("expression '{expression}' references undefined binding '{binding}'")]
    UndefinedBinding { expression: String, binding: String },

    /// The expression failed for any other reason.
    #[error("expression '{expression}' failed: {message}")]
    Expression { expression: String, message: String },

    /// A condition expression produced a non-boolean value.
    #[error("condition '{expression}' produced a non-boolean value")]
    NotBoolean { expression: String },

    /// A produced value could not be converted to its declared type.
    #[error("value conversion failed")]
    Conversion {
        #[from]
        source: ConversionError,
    },
}

/// Result type for run-time evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let err = LoadError::InvalidParameterCount {
            action: "mapIdentity".to_string(),
            expected: 4,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "action 'mapIdentity' expects 4 parameters, got 2"
        );
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::UndefinedBinding {
            expression: "attr[\"mail\"]".to_string(),
            binding: "mail".to_string(),
        };
        assert!(err.to_string().contains("undefined binding 'mail'"));
    }

    #[test]
    fn test_conversion_error_wraps() {
        let err: EvalError = ConversionError::invalid_value("email", "missing '@'").into();
        assert!(matches!(err, EvalError::Conversion { .. }));
    }
}
