//! Input-direction actions: remote assertion to local facts.
//!
//! Value-producing actions share the same tolerance policy: a null
//! expression result or a value that fails conversion to its declared
//! local type is skipped with a log entry, because data asserted by a
//! remote provider must not be able to abort the whole mapping. An
//! undefined binding, by contrast, is a profile bug and aborts the run.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use fedgate_core::{AttributeTypeResolver, AttributeVisibility, GroupPath, IdentityTypeResolver};

use crate::action::{
    parse_enum_param, require_arity, ActionEnvironment, ActionFactory, ActionOutcome,
    ParameterKind, ParameterSpec, TranslationAction,
};
use crate::actions::{value_items, value_to_string};
use crate::context::BindingContext;
use crate::error::{EvalResult, LoadError, LoadResult};
use crate::expr::{CompiledExpression, ExpressionEngine};
use crate::registry::ProfileDirection;
use crate::result::{
    AutomaticRequestAction, EntityStatusOperation, IdentityEffectMode, IdentityMapping,
    MappedAttribute, MappedGroup, ScheduledEntityChange, TranslationResult,
};

// ---------------------------------------------------------------------------
// mapIdentity
// ---------------------------------------------------------------------------

/// Factory for `mapIdentity`: map one-or-many identity values produced by
/// an expression onto a local identity type.
pub struct MapIdentityFactory;

const MAP_IDENTITY_PARAMS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "identityType",
        description: "mapIdentity.identityType.desc",
        kind: ParameterKind::IdentityType,
    },
    ParameterSpec {
        name: "expression",
        description: "mapIdentity.expression.desc",
        kind: ParameterKind::Expression,
    },
    ParameterSpec {
        name: "credentialRequirement",
        description: "mapIdentity.credentialRequirement.desc",
        kind: ParameterKind::CredentialRequirement,
    },
    ParameterSpec {
        name: "effect",
        description: "mapIdentity.effect.desc",
        kind: ParameterKind::Enumeration(&[
            "CREATE_OR_MATCH",
            "CREATE_ONLY",
            "MATCH_ONLY",
            "REQUIRE_MATCH",
        ]),
    },
];

impl ActionFactory for MapIdentityFactory {
    fn name(&self) -> &'static str {
        "mapIdentity"
    }

    fn direction(&self) -> ProfileDirection {
        ProfileDirection::Input
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        MAP_IDENTITY_PARAMS
    }

    fn create(
        &self,
        raw_params: &[String],
        env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>> {
        require_arity(self, raw_params)?;

        let identity_type = raw_params[0].clone();
        if !env.identity_types.is_known(&identity_type) {
            return Err(LoadError::UnknownIdentityType {
                name: identity_type,
            });
        }

        let expression = env.expressions.compile(&raw_params[1])?;
        let credential_requirement = non_empty(&raw_params[2]);
        let effect = parse_enum_param(
            "mapIdentity",
            "effect",
            &raw_params[3],
            IdentityEffectMode::wire_forms(),
            IdentityEffectMode::from_wire,
        )?;

        Ok(Box::new(MapIdentityAction {
            expressions: Arc::clone(&env.expressions),
            identity_types: Arc::clone(&env.identity_types),
            identity_type: raw_params[0].clone(),
            expression,
            credential_requirement,
            effect,
        }))
    }
}

struct MapIdentityAction {
    expressions: Arc<ExpressionEngine>,
    identity_types: Arc<dyn IdentityTypeResolver>,
    identity_type: String,
    expression: CompiledExpression,
    credential_requirement: Option<String>,
    effect: IdentityEffectMode,
}

impl TranslationAction for MapIdentityAction {
    fn name(&self) -> &'static str {
        "mapIdentity"
    }

    fn invoke(
        &self,
        ctx: &BindingContext,
        result: &mut TranslationResult,
        profile: &str,
    ) -> EvalResult<ActionOutcome> {
        let value = self.expressions.eval_value(&self.expression, ctx)?;
        let Some(items) = value_items(value) else {
            debug!(
                profile = %profile,
                expression = %self.expression.source(),
                "mapIdentity expression evaluated to null, skipping"
            );
            return Ok(ActionOutcome::Continue);
        };

        for item in &items {
            if item.is_null() {
                continue;
            }
            let raw = value_to_string(item);
            match self.identity_types.convert_from_string(
                &self.identity_type,
                &raw,
                ctx.provider(),
                profile,
            ) {
                Ok(converted) => result.add_identity(IdentityMapping {
                    effect: self.effect,
                    identity_type: self.identity_type.clone(),
                    value: converted,
                    credential_requirement: self.credential_requirement.clone(),
                }),
                Err(error) => {
                    warn!(
                        profile = %profile,
                        identity_type = %self.identity_type,
                        error = %error,
                        "Identity value not convertible, skipping"
                    );
                }
            }
        }
        Ok(ActionOutcome::Continue)
    }
}

// ---------------------------------------------------------------------------
// mapAttribute
// ---------------------------------------------------------------------------

/// Factory for `mapAttribute`: produce a local attribute from an
/// expression.
pub struct MapAttributeFactory;

const MAP_ATTRIBUTE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "attributeType",
        description: "mapAttribute.attributeType.desc",
        kind: ParameterKind::AttributeType,
    },
    ParameterSpec {
        name: "group",
        description: "mapAttribute.group.desc",
        kind: ParameterKind::GroupPath,
    },
    ParameterSpec {
        name: "expression",
        description: "mapAttribute.expression.desc",
        kind: ParameterKind::Expression,
    },
    ParameterSpec {
        name: "visibility",
        description: "mapAttribute.visibility.desc",
        kind: ParameterKind::Enumeration(&["FULL", "LOCAL"]),
    },
];

impl ActionFactory for MapAttributeFactory {
    fn name(&self) -> &'static str {
        "mapAttribute"
    }

    fn direction(&self) -> ProfileDirection {
        ProfileDirection::Input
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        MAP_ATTRIBUTE_PARAMS
    }

    fn create(
        &self,
        raw_params: &[String],
        env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>> {
        require_arity(self, raw_params)?;

        let name = raw_params[0].clone();
        if !env.attribute_types.is_known(&name) {
            return Err(LoadError::UnknownAttributeType { name });
        }

        let expression = env.expressions.compile(&raw_params[2])?;
        let visibility = parse_enum_param(
            "mapAttribute",
            "visibility",
            &raw_params[3],
            &["FULL", "LOCAL"],
            AttributeVisibility::from_wire,
        )?;

        Ok(Box::new(MapAttributeAction {
            expressions: Arc::clone(&env.expressions),
            attribute_types: Arc::clone(&env.attribute_types),
            attribute: raw_params[0].clone(),
            group: GroupPath::new(raw_params[1].clone()),
            expression,
            visibility,
        }))
    }
}

struct MapAttributeAction {
    expressions: Arc<ExpressionEngine>,
    attribute_types: Arc<dyn AttributeTypeResolver>,
    attribute: String,
    group: GroupPath,
    expression: CompiledExpression,
    visibility: AttributeVisibility,
}

impl TranslationAction for MapAttributeAction {
    fn name(&self) -> &'static str {
        "mapAttribute"
    }

    fn invoke(
        &self,
        ctx: &BindingContext,
        result: &mut TranslationResult,
        profile: &str,
    ) -> EvalResult<ActionOutcome> {
        let value = self.expressions.eval_value(&self.expression, ctx)?;
        let Some(items) = value_items(value) else {
            debug!(
                profile = %profile,
                attribute = %self.attribute,
                "mapAttribute expression evaluated to null, skipping"
            );
            return Ok(ActionOutcome::Continue);
        };

        let mut converted = Vec::with_capacity(items.len());
        for item in &items {
            match self.attribute_types.convert_value(&self.attribute, item) {
                Ok(value) => converted.push(value),
                Err(error) => {
                    // One bad value invalidates the whole attribute; a
                    // partially converted multi-value would be misleading.
                    warn!(
                        profile = %profile,
                        attribute = %self.attribute,
                        error = %error,
                        "Attribute value not convertible, skipping attribute"
                    );
                    return Ok(ActionOutcome::Continue);
                }
            }
        }

        result.add_attribute(MappedAttribute {
            name: self.attribute.clone(),
            group: self.group.clone(),
            visibility: self.visibility,
            values: converted,
            source_profile: profile.to_string(),
        });
        Ok(ActionOutcome::Continue)
    }
}

// ---------------------------------------------------------------------------
// mapGroup
// ---------------------------------------------------------------------------

/// Factory for `mapGroup`: produce group memberships from an expression.
pub struct MapGroupFactory;

const MAP_GROUP_PARAMS: &[ParameterSpec] = &[ParameterSpec {
    name: "expression",
    description: "mapGroup.expression.desc",
    kind: ParameterKind::Expression,
}];

impl ActionFactory for MapGroupFactory {
    fn name(&self) -> &'static str {
        "mapGroup"
    }

    fn direction(&self) -> ProfileDirection {
        ProfileDirection::Input
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        MAP_GROUP_PARAMS
    }

    fn create(
        &self,
        raw_params: &[String],
        env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>> {
        require_arity(self, raw_params)?;
        let expression = env.expressions.compile(&raw_params[0])?;
        Ok(Box::new(MapGroupAction {
            expressions: Arc::clone(&env.expressions),
            expression,
        }))
    }
}

struct MapGroupAction {
    expressions: Arc<ExpressionEngine>,
    expression: CompiledExpression,
}

impl TranslationAction for MapGroupAction {
    fn name(&self) -> &'static str {
        "mapGroup"
    }

    fn invoke(
        &self,
        ctx: &BindingContext,
        result: &mut TranslationResult,
        profile: &str,
    ) -> EvalResult<ActionOutcome> {
        let value = self.expressions.eval_value(&self.expression, ctx)?;
        let Some(items) = value_items(value) else {
            debug!(
                profile = %profile,
                expression = %self.expression.source(),
                "mapGroup expression evaluated to null, skipping"
            );
            return Ok(ActionOutcome::Continue);
        };

        for item in &items {
            if item.is_null() {
                continue;
            }
            result.add_group(MappedGroup {
                group: GroupPath::new(value_to_string(item)),
                source_profile: profile.to_string(),
            });
        }
        Ok(ActionOutcome::Continue)
    }
}

// ---------------------------------------------------------------------------
// entityChange
// ---------------------------------------------------------------------------

/// Factory for `entityChange`: schedule a status-change operation at
/// now + N days.
pub struct EntityChangeFactory;

const ENTITY_CHANGE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "operation",
        description: "entityChange.operation.desc",
        kind: ParameterKind::Enumeration(&["DISABLE", "REMOVE"]),
    },
    ParameterSpec {
        name: "daysToChange",
        description: "entityChange.daysToChange.desc",
        kind: ParameterKind::Days,
    },
];

impl ActionFactory for EntityChangeFactory {
    fn name(&self) -> &'static str {
        "entityChange"
    }

    fn direction(&self) -> ProfileDirection {
        ProfileDirection::Input
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        ENTITY_CHANGE_PARAMS
    }

    fn create(
        &self,
        raw_params: &[String],
        _env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>> {
        require_arity(self, raw_params)?;

        let operation = parse_enum_param(
            "entityChange",
            "operation",
            &raw_params[0],
            EntityStatusOperation::wire_forms(),
            EntityStatusOperation::from_wire,
        )?;

        let days: i64 =
            raw_params[1]
                .trim()
                .parse()
                .map_err(|_| LoadError::InvalidParameterValue {
                    action: "entityChange".to_string(),
                    parameter: "daysToChange".to_string(),
                    message: format!("'{}' is not a day count", raw_params[1]),
                })?;
        if days < 0 {
            return Err(LoadError::InvalidParameterValue {
                action: "entityChange".to_string(),
                parameter: "daysToChange".to_string(),
                message: "day count must be non-negative".to_string(),
            });
        }

        Ok(Box::new(EntityChangeAction { operation, days }))
    }
}

struct EntityChangeAction {
    operation: EntityStatusOperation,
    days: i64,
}

impl TranslationAction for EntityChangeAction {
    fn name(&self) -> &'static str {
        "entityChange"
    }

    fn invoke(
        &self,
        _ctx: &BindingContext,
        result: &mut TranslationResult,
        profile: &str,
    ) -> EvalResult<ActionOutcome> {
        let effective_at = Utc::now() + Duration::days(self.days);
        debug!(
            profile = %profile,
            operation = ?self.operation,
            effective_at = %effective_at,
            "Scheduling entity change"
        );
        result.add_entity_change(ScheduledEntityChange {
            operation: self.operation,
            effective_at,
        });
        Ok(ActionOutcome::Continue)
    }
}

// ---------------------------------------------------------------------------
// autoProcess
// ---------------------------------------------------------------------------

/// Factory for `autoProcess`: set the automatic request disposition.
///
/// Terminal for the profile's outcome, but does not by itself stop rule
/// evaluation; combine with `break` for that.
pub struct AutoProcessFactory;

const AUTO_PROCESS_PARAMS: &[ParameterSpec] = &[ParameterSpec {
    name: "action",
    description: "autoProcess.action.desc",
    kind: ParameterKind::Enumeration(&["accept", "reject", "drop"]),
}];

impl ActionFactory for AutoProcessFactory {
    fn name(&self) -> &'static str {
        "autoProcess"
    }

    fn direction(&self) -> ProfileDirection {
        ProfileDirection::Input
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        AUTO_PROCESS_PARAMS
    }

    fn create(
        &self,
        raw_params: &[String],
        _env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>> {
        require_arity(self, raw_params)?;
        let action = parse_enum_param(
            "autoProcess",
            "action",
            &raw_params[0],
            AutomaticRequestAction::wire_forms(),
            AutomaticRequestAction::from_wire,
        )?;
        Ok(Box::new(AutoProcessAction { action }))
    }
}

struct AutoProcessAction {
    action: AutomaticRequestAction,
}

impl TranslationAction for AutoProcessAction {
    fn name(&self) -> &'static str {
        "autoProcess"
    }

    fn invoke(
        &self,
        _ctx: &BindingContext,
        result: &mut TranslationResult,
        profile: &str,
    ) -> EvalResult<ActionOutcome> {
        debug!(profile = %profile, action = ?self.action, "Setting automatic request action");
        result.set_auto_action(self.action);
        Ok(ActionOutcome::Continue)
    }
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
