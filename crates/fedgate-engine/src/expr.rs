//! Expression evaluation.
//!
//! Conditions and value expressions are written in a small scripting
//! language (Rhai) and evaluated against a [`BindingContext`]. One
//! sandboxed engine is built per [`ExpressionEngine`] and shared by all
//! compiled expressions; compilation happens once at profile load time so
//! the per-run path is parse-free.
//!
//! Profile documents use single-quoted string literals
//! (`attr['mail']`), the administrator-facing syntax shared with the
//! other broker subsystems. Sources are normalized to double-quoted
//! literals before compilation.

use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::BindingContext;
use crate::error::{EvalError, EvalResult, LoadError, LoadResult};

/// Default maximum number of operations per evaluation.
const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

/// Default maximum call stack depth.
const DEFAULT_MAX_CALL_LEVELS: usize = 64;

/// Default maximum string size in bytes.
const DEFAULT_MAX_STRING_SIZE: usize = 65536;

/// Default maximum array size.
const DEFAULT_MAX_ARRAY_SIZE: usize = 10_000;

/// Default maximum map size.
const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Sandbox limits for expression evaluation.
#[derive(Debug, Clone)]
pub struct ExpressionConfig {
    /// Maximum number of operations before termination.
    pub max_operations: u64,
    /// Maximum call stack depth.
    pub max_call_levels: usize,
    /// Maximum string size in bytes.
    pub max_string_size: usize,
    /// Maximum array size.
    pub max_array_size: usize,
    /// Maximum map size.
    pub max_map_size: usize,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
        }
    }
}

/// An expression compiled at profile load time.
///
/// Holds the original source (for diagnostics and round-tripping) and the
/// compiled AST. Reusable across runs; evaluation never re-parses.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    ast: AST,
}

impl CompiledExpression {
    /// The original source text as authored.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Sandboxed expression engine shared by all profiles of a broker instance.
///
/// Immutable after construction; safe to share across concurrent runs.
pub struct ExpressionEngine {
    engine: Engine,
    prototype: Scope<'static>,
}

impl ExpressionEngine {
    /// Create an engine with default sandbox limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ExpressionConfig::default())
    }

    /// Create an engine with custom sandbox limits.
    #[must_use]
    pub fn with_config(config: ExpressionConfig) -> Self {
        let mut engine = Engine::new();

        // Sandbox limits
        engine.set_max_operations(config.max_operations);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);

        // Undefined variables are load-time errors; missing map keys are
        // run-time undefined-binding errors, never silent unit.
        engine.set_strict_variables(true);
        engine.set_fail_on_invalid_map_property(true);

        Self::register_builtin_functions(&mut engine);

        Self {
            engine,
            prototype: prototype_scope(),
        }
    }

    /// Register the utility functions available to profile expressions.
    fn register_builtin_functions(engine: &mut Engine) {
        engine.register_fn("lowercase", |s: &str| s.to_lowercase());
        engine.register_fn("uppercase", |s: &str| s.to_uppercase());
        engine.register_fn("trim", |s: &str| s.trim().to_string());

        engine.register_fn("split", |s: &str, sep: &str| -> rhai::Array {
            s.split(sep).map(|p| Dynamic::from(p.to_string())).collect()
        });

        engine.register_fn("join", |arr: rhai::Array, sep: &str| -> String {
            arr.iter()
                .map(std::string::ToString::to_string)
                .collect::<Vec<_>>()
                .join(sep)
        });

        engine.register_fn("contains_str", |s: &str, substr: &str| s.contains(substr));

        fn is_empty_value(v: &Dynamic) -> bool {
            v.is_unit() || (v.is_string() && v.clone_cast::<String>().is_empty())
        }

        engine.register_fn("default_val", |val: Dynamic, default: Dynamic| -> Dynamic {
            if is_empty_value(&val) {
                default
            } else {
                val
            }
        });

        engine.register_fn("coalesce2", |a: Dynamic, b: Dynamic| -> Dynamic {
            if is_empty_value(&a) {
                b
            } else {
                a
            }
        });

        // Logging hooks for profile authors
        engine.register_fn("log_info", |msg: &str| {
            info!(expression_log = %msg, "Profile expression log");
        });

        engine.register_fn("log_warn", |msg: &str| {
            warn!(expression_log = %msg, "Profile expression warning");
        });

        engine.register_fn("log_debug", |msg: &str| {
            debug!(expression_log = %msg, "Profile expression debug");
        });
    }

    /// Compile an expression source.
    ///
    /// Fails fast with [`LoadError::ExpressionCompile`] so that a broken
    /// expression is an administrator-visible load error, never a run-time
    /// surprise. Compilation happens against a prototype scope declaring
    /// the standard binding names, which lets strict-variable checking
    /// reject unknown variables here.
    pub fn compile(&self, source: &str) -> LoadResult<CompiledExpression> {
        let normalized = normalize_quotes(source);
        let ast = self
            .engine
            .compile_with_scope(&self.prototype, &normalized)
            .map_err(|e| LoadError::ExpressionCompile {
                expression: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(CompiledExpression {
            source: source.to_string(),
            ast,
        })
    }

    /// Evaluate a value expression; the result may be a scalar, a list, or
    /// null.
    pub fn eval_value(&self, expr: &CompiledExpression, ctx: &BindingContext) -> EvalResult<Value> {
        let dynamic = self.eval_dynamic(expr, ctx)?;
        rhai::serde::from_dynamic(&dynamic).map_err(|e| EvalError::Expression {
            expression: expr.source.clone(),
            message: format!("result conversion: {e}"),
        })
    }

    /// Evaluate a condition expression to a boolean.
    ///
    /// A non-boolean result is an evaluation error, not a truthiness
    /// judgement.
    pub fn eval_bool(&self, expr: &CompiledExpression, ctx: &BindingContext) -> EvalResult<bool> {
        let dynamic = self.eval_dynamic(expr, ctx)?;
        dynamic.as_bool().map_err(|_| EvalError::NotBoolean {
            expression: expr.source.clone(),
        })
    }

    fn eval_dynamic(&self, expr: &CompiledExpression, ctx: &BindingContext) -> EvalResult<Dynamic> {
        let mut scope = runtime_scope(ctx);
        self.engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &expr.ast)
            .map_err(|e| classify_eval_error(&expr.source, &e))
    }
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a Rhai evaluation error onto the engine taxonomy.
///
/// Unresolved variables, properties and index lookups all mean the
/// expression touched a binding the context does not define.
fn classify_eval_error(source: &str, err: &EvalAltResult) -> EvalError {
    match err {
        EvalAltResult::ErrorVariableNotFound(name, _)
        | EvalAltResult::ErrorPropertyNotFound(name, _) => EvalError::UndefinedBinding {
            expression: source.to_string(),
            binding: name.clone(),
        },
        EvalAltResult::ErrorIndexNotFound(index, _) => EvalError::UndefinedBinding {
            expression: source.to_string(),
            binding: index.to_string(),
        },
        other => EvalError::Expression {
            expression: source.to_string(),
            message: other.to_string(),
        },
    }
}

// The prototype scope (used at compile time) and the runtime scope must
// declare the same names in the same order; Rhai resolves scoped variables
// positionally against the compiling scope.

/// Scope declaring the standard binding names for strict-variable checks.
fn prototype_scope() -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push("provider", String::new());
    scope.push("attr", rhai::Map::new());
    scope.push("attrs", rhai::Map::new());
    scope.push_dynamic("id", Dynamic::UNIT);
    scope.push_dynamic("idType", Dynamic::UNIT);
    scope.push("idsByType", rhai::Map::new());
    scope.push("groups", rhai::Array::new());
    scope
}

/// Scope carrying the actual bindings of one run.
fn runtime_scope(ctx: &BindingContext) -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push("provider", ctx.provider.as_str().to_string());
    scope.push_dynamic("attr", to_dynamic_or_unit(&ctx.attr));
    scope.push_dynamic("attrs", to_dynamic_or_unit(&ctx.attrs));
    scope.push_dynamic(
        "id",
        ctx.id
            .as_ref()
            .map_or(Dynamic::UNIT, |v| Dynamic::from(v.clone())),
    );
    scope.push_dynamic(
        "idType",
        ctx.id_type
            .as_ref()
            .map_or(Dynamic::UNIT, |v| Dynamic::from(v.clone())),
    );
    scope.push_dynamic("idsByType", to_dynamic_or_unit(&ctx.ids_by_type));
    scope.push(
        "groups",
        ctx.groups
            .iter()
            .map(|g| Dynamic::from(g.clone()))
            .collect::<rhai::Array>(),
    );
    scope
}

fn to_dynamic_or_unit<T: serde::Serialize>(value: &T) -> Dynamic {
    rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT)
}

/// Rewrite single-quoted string literals to double-quoted ones, leaving
/// double-quoted literals untouched.
fn normalize_quotes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();
    let mut in_double = false;
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_double = !in_double;
                out.push(c);
            }
            '\\' if in_double => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '\'' if !in_double => {
                out.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            out.push('\\');
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedgate_core::{ProviderId, RemoteAttribute, RemoteGroupMembership, RemoteInput};
    use serde_json::json;

    fn test_context() -> BindingContext {
        let mut input = RemoteInput::new(ProviderId::new("saml-uni"));
        input
            .attributes
            .push(RemoteAttribute::single("mail", "a@b.org"));
        input.attributes.push(RemoteAttribute::new(
            "memberOf",
            vec![json!("staff"), json!("faculty")],
        ));
        input.groups.push(RemoteGroupMembership {
            group: "cs".to_string(),
        });
        BindingContext::from_remote(&input)
    }

    #[test]
    fn test_normalize_quotes() {
        assert_eq!(normalize_quotes("attr['mail']"), "attr[\"mail\"]");
        assert_eq!(normalize_quotes(r#"attr["mail"]"#), r#"attr["mail"]"#);
        assert_eq!(
            normalize_quotes(r#""it's quoted" + 'x'"#),
            r#""it's quoted" + "x""#
        );
    }

    #[test]
    fn test_compile_failure_is_load_error() {
        let engine = ExpressionEngine::new();
        let err = engine.compile("let x = ;").unwrap_err();
        assert!(matches!(err, LoadError::ExpressionCompile { .. }));
    }

    #[test]
    fn test_unknown_variable_rejected_at_compile_time() {
        let engine = ExpressionEngine::new();
        let err = engine.compile("bogusBinding == 1").unwrap_err();
        assert!(matches!(err, LoadError::ExpressionCompile { .. }));
    }

    #[test]
    fn test_eval_bool() {
        let engine = ExpressionEngine::new();
        let ctx = test_context();

        let expr = engine.compile("true").unwrap();
        assert!(engine.eval_bool(&expr, &ctx).unwrap());

        let expr = engine.compile("attr['mail'] == 'a@b.org'").unwrap();
        assert!(engine.eval_bool(&expr, &ctx).unwrap());
    }

    #[test]
    fn test_non_boolean_condition_is_error() {
        let engine = ExpressionEngine::new();
        let ctx = test_context();
        let expr = engine.compile("attr['mail']").unwrap();
        assert!(matches!(
            engine.eval_bool(&expr, &ctx),
            Err(EvalError::NotBoolean { .. })
        ));
    }

    #[test]
    fn test_eval_value_scalar_and_list() {
        let engine = ExpressionEngine::new();
        let ctx = test_context();

        let expr = engine.compile("attr['mail']").unwrap();
        assert_eq!(engine.eval_value(&expr, &ctx).unwrap(), json!("a@b.org"));

        let expr = engine.compile("attrs['memberOf']").unwrap();
        assert_eq!(
            engine.eval_value(&expr, &ctx).unwrap(),
            json!(["staff", "faculty"])
        );
    }

    #[test]
    fn test_missing_map_key_is_undefined_binding() {
        let engine = ExpressionEngine::new();
        let ctx = test_context();
        let expr = engine.compile("attr['absent']").unwrap();
        assert!(matches!(
            engine.eval_value(&expr, &ctx),
            Err(EvalError::UndefinedBinding { .. })
        ));
    }

    #[test]
    fn test_unset_primary_identity_evaluates_to_null() {
        let engine = ExpressionEngine::new();
        let ctx = test_context();
        let expr = engine.compile("id").unwrap();
        assert_eq!(engine.eval_value(&expr, &ctx).unwrap(), json!(null));
    }

    #[test]
    fn test_builtin_functions() {
        let engine = ExpressionEngine::new();
        let ctx = test_context();

        let expr = engine.compile("uppercase(attr['mail'])").unwrap();
        assert_eq!(engine.eval_value(&expr, &ctx).unwrap(), json!("A@B.ORG"));

        let expr = engine.compile("join(split('a,b', ','), '-')").unwrap();
        assert_eq!(engine.eval_value(&expr, &ctx).unwrap(), json!("a-b"));

        let expr = engine.compile("default_val(id, 'fallback')").unwrap();
        assert_eq!(engine.eval_value(&expr, &ctx).unwrap(), json!("fallback"));
    }

    #[test]
    fn test_runaway_expression_terminates() {
        let engine = ExpressionEngine::with_config(ExpressionConfig {
            max_operations: 100,
            ..ExpressionConfig::default()
        });
        let ctx = test_context();
        let expr = engine
            .compile("let x = 0; while x >= 0 { x += 1; }; x")
            .unwrap();
        assert!(matches!(
            engine.eval_value(&expr, &ctx),
            Err(EvalError::Expression { .. })
        ));
    }

    #[test]
    fn test_groups_binding() {
        let engine = ExpressionEngine::new();
        let ctx = test_context();
        let expr = engine.compile("groups").unwrap();
        assert_eq!(engine.eval_value(&expr, &ctx).unwrap(), json!(["cs"]));
    }
}
