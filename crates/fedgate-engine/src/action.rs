//! Action abstractions.
//!
//! An [`ActionFactory`] declares an action's name, direction and formal
//! parameter shape, validates raw string parameters at profile load time,
//! and produces an executable [`TranslationAction`]. Instances are
//! immutable and reusable across runs; any parse/compile work happens at
//! construction.

use std::sync::Arc;

use fedgate_core::{AttributeTypeResolver, IdentityTypeResolver};

use crate::context::BindingContext;
use crate::error::{EvalResult, LoadError, LoadResult};
use crate::expr::ExpressionEngine;
use crate::registry::ProfileDirection;
use crate::result::TranslationResult;

/// Control-flow outcome of an action invocation.
///
/// Break is expected and frequent, so it is a returned sentinel rather
/// than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Continue with the next rule.
    Continue,
    /// Stop evaluating further rules; everything accumulated so far
    /// stands.
    Break,
}

impl std::fmt::Debug for dyn TranslationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationAction")
            .field("name", &self.name())
            .finish()
    }
}

/// An executable, parameterized action.
pub trait TranslationAction: Send + Sync {
    /// The registered action type name.
    fn name(&self) -> &'static str;

    /// Apply the action's effects to the result.
    ///
    /// `profile` is the name of the executing profile, used to tag
    /// produced facts.
    fn invoke(
        &self,
        ctx: &BindingContext,
        result: &mut TranslationResult,
        profile: &str,
    ) -> EvalResult<ActionOutcome>;
}

/// Declared type of one action parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Free text.
    Text,
    /// Multi-line free text.
    LargeText,
    /// A value-producing expression, compiled at load time.
    Expression,
    /// One of a fixed set of values.
    Enumeration(&'static [&'static str]),
    /// A local group path.
    GroupPath,
    /// A declared local identity type name.
    IdentityType,
    /// A credential requirement name.
    CredentialRequirement,
    /// A declared local attribute type name.
    AttributeType,
    /// A non-negative day count.
    Days,
}

/// Formal description of one action parameter, for validation and for the
/// administrative UI.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: &'static str,

    /// Message key of the human description.
    pub description: &'static str,

    /// Declared slot type.
    pub kind: ParameterKind,
}

/// Collaborators available to factories while constructing actions.
pub struct ActionEnvironment {
    /// Shared expression engine; compiles all conditions and value
    /// expressions.
    pub expressions: Arc<ExpressionEngine>,

    /// Identity type subsystem.
    pub identity_types: Arc<dyn IdentityTypeResolver>,

    /// Attribute type subsystem.
    pub attribute_types: Arc<dyn AttributeTypeResolver>,
}

impl ActionEnvironment {
    /// Assemble an environment from its collaborators.
    #[must_use]
    pub fn new(
        expressions: Arc<ExpressionEngine>,
        identity_types: Arc<dyn IdentityTypeResolver>,
        attribute_types: Arc<dyn AttributeTypeResolver>,
    ) -> Self {
        Self {
            expressions,
            identity_types,
            attribute_types,
        }
    }
}

impl Clone for ActionEnvironment {
    fn clone(&self) -> Self {
        Self {
            expressions: Arc::clone(&self.expressions),
            identity_types: Arc::clone(&self.identity_types),
            attribute_types: Arc::clone(&self.attribute_types),
        }
    }
}

impl std::fmt::Debug for dyn ActionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionFactory")
            .field("name", &self.name())
            .finish()
    }
}

/// Validates parameters and produces executable action instances.
pub trait ActionFactory: Send + Sync {
    /// The action type name this factory is registered under.
    fn name(&self) -> &'static str;

    /// Profile direction this action belongs to.
    fn direction(&self) -> ProfileDirection;

    /// Formal parameter shape.
    fn parameters(&self) -> &'static [ParameterSpec];

    /// Validate the raw parameters and construct the action.
    fn create(
        &self,
        raw_params: &[String],
        env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>>;
}

/// Check the raw parameter count against the declared arity.
pub(crate) fn require_arity(
    factory: &dyn ActionFactory,
    raw_params: &[String],
) -> LoadResult<()> {
    let expected = factory.parameters().len();
    if raw_params.len() != expected {
        return Err(LoadError::InvalidParameterCount {
            action: factory.name().to_string(),
            expected,
            actual: raw_params.len(),
        });
    }
    Ok(())
}

/// Parse an enumeration slot, reporting the allowed values on failure.
pub(crate) fn parse_enum_param<T>(
    action: &'static str,
    parameter: &'static str,
    raw: &str,
    allowed: &'static [&'static str],
    parse: impl Fn(&str) -> Option<T>,
) -> LoadResult<T> {
    parse(raw).ok_or_else(|| LoadError::InvalidParameterValue {
        action: action.to_string(),
        parameter: parameter.to_string(),
        message: format!("'{raw}' is not one of {allowed:?}"),
    })
}

/// Environment over permissive resolvers, for tests.
#[cfg(test)]
pub(crate) fn test_environment() -> ActionEnvironment {
    use fedgate_core::{PermissiveAttributeTypes, PermissiveIdentityTypes};

    ActionEnvironment::new(
        Arc::new(ExpressionEngine::new()),
        Arc::new(PermissiveIdentityTypes),
        Arc::new(PermissiveAttributeTypes),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoParamFactory;

    impl ActionFactory for TwoParamFactory {
        fn name(&self) -> &'static str {
            "twoParam"
        }

        fn direction(&self) -> ProfileDirection {
            ProfileDirection::Input
        }

        fn parameters(&self) -> &'static [ParameterSpec] {
            &[
                ParameterSpec {
                    name: "first",
                    description: "first.desc",
                    kind: ParameterKind::Text,
                },
                ParameterSpec {
                    name: "second",
                    description: "second.desc",
                    kind: ParameterKind::Text,
                },
            ]
        }

        fn create(
            &self,
            raw_params: &[String],
            _env: &ActionEnvironment,
        ) -> LoadResult<Box<dyn TranslationAction>> {
            require_arity(self, raw_params)?;
            unreachable!("arity check only in this test")
        }
    }

    #[test]
    fn test_arity_mismatch_is_load_error() {
        let factory = TwoParamFactory;
        let err = factory
            .create(&["only-one".to_string()], &test_environment())
            .unwrap_err();
        match err {
            LoadError::InvalidParameterCount {
                action,
                expected,
                actual,
            } => {
                assert_eq!(action, "twoParam");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_enum_param_reports_allowed_values() {
        let err = parse_enum_param(
            "mapIdentity",
            "effect",
            "NOPE",
            &["A", "B"],
            |_| Option::<()>::None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("[\"A\", \"B\"]"));
    }
}
