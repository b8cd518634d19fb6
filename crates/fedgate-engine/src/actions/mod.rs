//! Built-in action implementations.
//!
//! Input-direction actions translate a remote assertion into local facts;
//! output-direction actions build an outbound assertion from local entity
//! state. The `break` action is available in both directions.

pub mod input;
pub mod output;

use serde_json::Value;

use crate::action::{
    require_arity, ActionEnvironment, ActionFactory, ActionOutcome, ParameterSpec,
    TranslationAction,
};
use crate::context::BindingContext;
use crate::error::{EvalResult, LoadResult};
use crate::registry::ProfileDirection;
use crate::result::TranslationResult;

/// Expand an evaluated expression into its items.
///
/// Null contributes nothing; a list contributes each element; a scalar
/// contributes itself.
pub(crate) fn value_items(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(items),
        scalar => Some(vec![scalar]),
    }
}

/// Render an expression item as the raw string handed to a resolver.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Factory for the `break` action.
///
/// Registered in both directions; each registry gets its own instance.
pub struct BreakFactory {
    direction: ProfileDirection,
}

impl BreakFactory {
    /// Input-direction instance.
    #[must_use]
    pub fn input() -> Self {
        Self {
            direction: ProfileDirection::Input,
        }
    }

    /// Output-direction instance.
    #[must_use]
    pub fn output() -> Self {
        Self {
            direction: ProfileDirection::Output,
        }
    }
}

impl ActionFactory for BreakFactory {
    fn name(&self) -> &'static str {
        "break"
    }

    fn direction(&self) -> ProfileDirection {
        self.direction
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        &[]
    }

    fn create(
        &self,
        raw_params: &[String],
        _env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>> {
        require_arity(self, raw_params)?;
        Ok(Box::new(BreakAction))
    }
}

/// Stops evaluation of the remaining rules.
struct BreakAction;

impl TranslationAction for BreakAction {
    fn name(&self) -> &'static str {
        "break"
    }

    fn invoke(
        &self,
        _ctx: &BindingContext,
        _result: &mut TranslationResult,
        _profile: &str,
    ) -> EvalResult<ActionOutcome> {
        Ok(ActionOutcome::Break)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_environment;
    use fedgate_core::{ProviderId, RemoteInput};
    use serde_json::json;

    #[test]
    fn test_value_items() {
        assert_eq!(value_items(json!(null)), None);
        assert_eq!(value_items(json!("x")), Some(vec![json!("x")]));
        assert_eq!(
            value_items(json!(["a", "b"])),
            Some(vec![json!("a"), json!("b")])
        );
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("plain")), "plain");
        assert_eq!(value_to_string(&json!(7)), "7");
    }

    #[test]
    fn test_break_action_signals_break() {
        let env = test_environment();
        let action = BreakFactory::input().create(&[], &env).unwrap();
        let ctx = BindingContext::from_remote(&RemoteInput::new(ProviderId::new("idp")));
        let mut result = TranslationResult::new();
        let outcome = action.invoke(&ctx, &mut result, "profile-1").unwrap();
        assert_eq!(outcome, ActionOutcome::Break);
        assert!(result.is_empty());
    }

    #[test]
    fn test_break_rejects_parameters() {
        let env = test_environment();
        let err = BreakFactory::input()
            .create(&["extra".to_string()], &env)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::LoadError::InvalidParameterCount { .. }
        ));
    }
}
