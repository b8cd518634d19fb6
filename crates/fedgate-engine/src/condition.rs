//! Rule conditions.

use std::sync::Arc;

use crate::context::BindingContext;
use crate::error::{EvalResult, LoadResult};
use crate::expr::{CompiledExpression, ExpressionEngine};

/// Boolean expression gating a rule.
///
/// Compiled once at profile load time. Whether an evaluation failure
/// counts as "does not fire" is the runner's policy, not the condition's;
/// this type only reports the outcome.
pub struct TranslationCondition {
    expressions: Arc<ExpressionEngine>,
    expression: CompiledExpression,
}

impl std::fmt::Debug for TranslationCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCondition")
            .field("source", &self.expression.source())
            .finish()
    }
}

impl TranslationCondition {
    /// Compile a condition from its source text.
    pub fn compile(expressions: &Arc<ExpressionEngine>, source: &str) -> LoadResult<Self> {
        let expression = expressions.compile(source)?;
        Ok(Self {
            expressions: Arc::clone(expressions),
            expression,
        })
    }

    /// The condition source as authored.
    #[must_use]
    pub fn source(&self) -> &str {
        self.expression.source()
    }

    /// Evaluate against a binding context.
    pub fn evaluate(&self, ctx: &BindingContext) -> EvalResult<bool> {
        self.expressions.eval_bool(&self.expression, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvalError, LoadError};
    use fedgate_core::{ProviderId, RemoteAttribute, RemoteInput};

    fn context() -> BindingContext {
        let mut input = RemoteInput::new(ProviderId::new("idp"));
        input
            .attributes
            .push(RemoteAttribute::single("mail", "a@b.org"));
        BindingContext::from_remote(&input)
    }

    #[test]
    fn test_condition_evaluates() {
        let engine = Arc::new(ExpressionEngine::new());
        let condition =
            TranslationCondition::compile(&engine, "attr['mail'] == 'a@b.org'").unwrap();
        assert!(condition.evaluate(&context()).unwrap());

        let condition = TranslationCondition::compile(&engine, "provider == 'other'").unwrap();
        assert!(!condition.evaluate(&context()).unwrap());
    }

    #[test]
    fn test_condition_compile_failure() {
        let engine = Arc::new(ExpressionEngine::new());
        let err = TranslationCondition::compile(&engine, "attr[").unwrap_err();
        assert!(matches!(err, LoadError::ExpressionCompile { .. }));
    }

    #[test]
    fn test_condition_missing_binding_is_error_not_false() {
        let engine = Arc::new(ExpressionEngine::new());
        let condition =
            TranslationCondition::compile(&engine, "attr['absent'] == 'x'").unwrap();
        assert!(matches!(
            condition.evaluate(&context()),
            Err(EvalError::UndefinedBinding { .. })
        ));
    }
}
