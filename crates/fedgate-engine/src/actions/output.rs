//! Output-direction actions: local entity state to outbound assertion.
//!
//! Symmetric counterparts of the input actions. Outgoing attributes are
//! untyped from the broker's perspective (the consuming protocol endpoint
//! encodes them), so no attribute-type conversion happens here.

use std::sync::Arc;

use tracing::debug;

use fedgate_core::GroupPath;

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
    IdentityEffectMode, IdentityMapping, MappedAttribute, TranslationResult,
};

/// Factory for `createAttribute`: add an attribute to the outgoing
/// assertion.
pub struct CreateAttributeFactory;

const CREATE_ATTRIBUTE_PARAMS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "attributeName",
        description: "createAttribute.attributeName.desc",
        kind: ParameterKind::Text,
    },
    ParameterSpec {
        name: "expression",
        description: "createAttribute.expression.desc",
        kind: ParameterKind::Expression,
    },
];

impl ActionFactory for CreateAttributeFactory {
    fn name(&self) -> &'static str {
        "createAttribute"
    }

    fn direction(&self) -> ProfileDirection {
        ProfileDirection::Output
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        CREATE_ATTRIBUTE_PARAMS
    }

    fn create(
        &self,
        raw_params: &[String],
        env: &ActionEnvironment,
    ) -> LoadResult<Box<dyn TranslationAction>> {
        require_arity(self, raw_params)?;
        let expression = env.expressions.compile(&raw_params[1])?;
        Ok(Box::new(CreateAttributeAction {
            expressions: Arc::clone(&env.expressions),
            attribute: raw_params[0].clone(),
            expression,
        }))
    }
}

struct CreateAttributeAction {
    expressions: Arc<ExpressionEngine>,
    attribute: String,
    expression: CompiledExpression,
}

impl TranslationAction for CreateAttributeAction {
    fn name(&self) -> &'static str {
        "createAttribute"
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
                "createAttribute expression evaluated to null, skipping"
            );
            return Ok(ActionOutcome::Continue);
        };

        result.add_attribute(MappedAttribute {
            name: self.attribute.clone(),
            group: GroupPath::new("/"),
            visibility: fedgate_core::AttributeVisibility::Full,
            values: items,
            source_profile: profile.to_string(),
        });
        Ok(ActionOutcome::Continue)
    }
}

/// Factory for `createIdentity`: add an identity to the outgoing
/// assertion.
pub struct CreateIdentityFactory;

const CREATE_IDENTITY_PARAMS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "identityType",
        description: "createIdentity.identityType.desc",
        kind: ParameterKind::IdentityType,
    },
    ParameterSpec {
        name: "expression",
        description: "createIdentity.expression.desc",
        kind: ParameterKind::Expression,
    },
    ParameterSpec {
        name: "effect",
        description: "createIdentity.effect.desc",
        kind: ParameterKind::Enumeration(&[
            "CREATE_OR_MATCH",
            "CREATE_ONLY",
            "MATCH_ONLY",
            "REQUIRE_MATCH",
        ]),
    },
];

impl ActionFactory for CreateIdentityFactory {
    fn name(&self) -> &'static str {
        "createIdentity"
    }

    fn direction(&self) -> ProfileDirection {
        ProfileDirection::Output
    }

    fn parameters(&self) -> &'static [ParameterSpec] {
        CREATE_IDENTITY_PARAMS
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
        let effect = parse_enum_param(
            "createIdentity",
            "effect",
            &raw_params[2],
            IdentityEffectMode::wire_forms(),
            IdentityEffectMode::from_wire,
        )?;

        Ok(Box::new(CreateIdentityAction {
            expressions: Arc::clone(&env.expressions),
            identity_type: raw_params[0].clone(),
            expression,
            effect,
        }))
    }
}

struct CreateIdentityAction {
    expressions: Arc<ExpressionEngine>,
    identity_type: String,
    expression: CompiledExpression,
    effect: IdentityEffectMode,
}

impl TranslationAction for CreateIdentityAction {
    fn name(&self) -> &'static str {
        "createIdentity"
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
                identity_type = %self.identity_type,
                "createIdentity expression evaluated to null, skipping"
            );
            return Ok(ActionOutcome::Continue);
        };

        for item in &items {
            if item.is_null() {
                continue;
            }
            result.add_identity(IdentityMapping {
                effect: self.effect,
                identity_type: self.identity_type.clone(),
                value: value_to_string(item),
                credential_requirement: None,
            });
        }
        Ok(ActionOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_environment;
    use fedgate_core::{
        AttributeVisibility, LocalAttribute, LocalEntity, LocalIdentity, ProviderId,
    };
    use serde_json::json;

    fn entity_context() -> BindingContext {
        let entity = LocalEntity {
            attributes: vec![LocalAttribute {
                name: "cn".to_string(),
                values: vec![json!("Jane Doe")],
            }],
            identities: vec![LocalIdentity {
                identity_type: "userName".to_string(),
                value: "jane".to_string(),
            }],
            groups: vec![],
        };
        BindingContext::from_entity(ProviderId::new("sp-portal"), &entity)
    }

    fn create(factory: &dyn ActionFactory, params: &[&str]) -> Box<dyn TranslationAction> {
        let raw: Vec<String> = params.iter().map(|p| (*p).to_string()).collect();
        factory.create(&raw, &test_environment()).unwrap()
    }

    #[test]
    fn test_create_attribute() {
        let action = create(&CreateAttributeFactory, &["displayName", "attr['cn']"]);
        let mut result = TranslationResult::new();
        action
            .invoke(&entity_context(), &mut result, "out-profile")
            .unwrap();

        assert_eq!(result.attributes.len(), 1);
        let attribute = &result.attributes[0];
        assert_eq!(attribute.name, "displayName");
        assert_eq!(attribute.visibility, AttributeVisibility::Full);
        assert_eq!(attribute.values, vec![json!("Jane Doe")]);
        assert_eq!(attribute.source_profile, "out-profile");
    }

    #[test]
    fn test_create_identity() {
        let action = create(
            &CreateIdentityFactory,
            &["userName", "idsByType['userName']", "MATCH_ONLY"],
        );
        let mut result = TranslationResult::new();
        action
            .invoke(&entity_context(), &mut result, "out-profile")
            .unwrap();

        assert_eq!(result.identities.len(), 1);
        assert_eq!(result.identities[0].value, "jane");
        assert_eq!(result.identities[0].effect, IdentityEffectMode::MatchOnly);
    }

    #[test]
    fn test_create_attribute_null_skips() {
        let action = create(&CreateAttributeFactory, &["nickname", "()"]);
        let mut result = TranslationResult::new();
        action
            .invoke(&entity_context(), &mut result, "out-profile")
            .unwrap();
        assert!(result.attributes.is_empty());
    }
}
