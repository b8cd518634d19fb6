//! Compiled translation profiles and the profile loader.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::action::{ActionEnvironment, TranslationAction};
use crate::condition::TranslationCondition;
use crate::document::ProfileDocument;
use crate::error::{LoadError, LoadResult};
use crate::migration::migrate_document;
use crate::registry::{ActionRegistry, ProfileDirection};

/// How the store should treat previously profile-sourced facts absent from
/// the latest result (input profiles only).
///
/// The engine itself never acts on this; it tags produced facts with the
/// profile name so the store can.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileMode {
    /// Only add/update facts.
    #[default]
    UpdateOnly,
    /// Additionally remove stale facts sourced from this profile.
    UpdateAndRemoveMissing,
}

/// One compiled rule: a condition gating an action.
///
/// Immutable; owns both members exclusively.
#[derive(Debug)]
pub struct TranslationRule {
    pub(crate) condition: TranslationCondition,
    pub(crate) action: Box<dyn TranslationAction>,
}

impl TranslationRule {
    /// Pair a condition with an action.
    #[must_use]
    pub fn new(condition: TranslationCondition, action: Box<dyn TranslationAction>) -> Self {
        Self { condition, action }
    }

    /// The gating condition.
    #[must_use]
    pub fn condition(&self) -> &TranslationCondition {
        &self.condition
    }

    /// Name of the action type.
    #[must_use]
    pub fn action_name(&self) -> &str {
        self.action.name()
    }
}

/// A loaded, executable translation profile.
///
/// Immutable after construction and safely shared across concurrent runs.
#[derive(Debug)]
pub struct TranslationProfile {
    name: String,
    description: String,
    direction: ProfileDirection,
    mode: Option<ProfileMode>,
    rules: Vec<TranslationRule>,
}

impl TranslationProfile {
    /// Profile name; the tag applied to produced facts.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Profile direction.
    #[must_use]
    pub fn direction(&self) -> ProfileDirection {
        self.direction
    }

    /// Unmatched-fact handling mode; `None` on output profiles.
    #[must_use]
    pub fn mode(&self) -> Option<ProfileMode> {
        self.mode
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[TranslationRule] {
        &self.rules
    }
}

/// Loads persisted profile documents into executable profiles.
///
/// Construction-time work (expression compilation, parameter parsing,
/// type-name resolution) happens here; running a loaded profile is
/// parse-free.
pub struct ProfileLoader {
    registry: Arc<ActionRegistry>,
    env: ActionEnvironment,
}

impl ProfileLoader {
    /// Create a loader over one direction's registry.
    #[must_use]
    pub fn new(registry: Arc<ActionRegistry>, env: ActionEnvironment) -> Self {
        Self { registry, env }
    }

    /// Load a document, migrating it first when it predates versioning.
    ///
    /// Migration logs its own warnings; callers wanting to persist the
    /// upgraded document should run [`migrate_document`] themselves and
    /// store the outcome.
    pub fn load(&self, doc: &ProfileDocument) -> LoadResult<TranslationProfile> {
        let migrated;
        let doc = if doc.is_legacy() {
            migrated = migrate_document(doc).document;
            &migrated
        } else {
            doc
        };

        let mut rules = Vec::with_capacity(doc.rules.len());
        for rule in &doc.rules {
            let condition =
                TranslationCondition::compile(&self.env.expressions, &rule.condition.condition_value)?;
            let factory = self.registry.lookup(&rule.action.name)?;
            // Registries are direction-pure by construction; this guards
            // profiles loaded against a hand-assembled registry.
            if factory.direction() != self.registry.direction() {
                return Err(LoadError::IncompatibleActionType {
                    action: rule.action.name.clone(),
                    expected: self.registry.direction().to_string(),
                    actual: factory.direction().to_string(),
                });
            }
            let action = factory.create(&rule.action.parameters, &self.env)?;
            rules.push(TranslationRule::new(condition, action));
        }

        let mode = match self.registry.direction() {
            ProfileDirection::Input => Some(doc.mode.unwrap_or_default()),
            ProfileDirection::Output => {
                if doc.mode.is_some() {
                    warn!(profile = %doc.name, "Output profile declares a mode; ignored");
                }
                None
            }
        };

        Ok(TranslationProfile {
            name: doc.name.clone(),
            description: doc.description.clone(),
            direction: self.registry.direction(),
            mode,
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_environment;
    use crate::document::RuleDocument;

    fn input_loader() -> ProfileLoader {
        ProfileLoader::new(
            Arc::new(ActionRegistry::input_defaults()),
            test_environment(),
        )
    }

    fn versioned_document() -> ProfileDocument {
        let mut doc = ProfileDocument::new("saml-uni-in");
        doc.rules.push(RuleDocument::new(
            "true",
            "mapIdentity",
            vec![
                "email".to_string(),
                "attr['mail']".to_string(),
                String::new(),
                "CREATE_OR_MATCH".to_string(),
            ],
        ));
        doc
    }

    #[test]
    fn test_load_versioned_document() {
        let profile = input_loader().load(&versioned_document()).unwrap();
        assert_eq!(profile.name(), "saml-uni-in");
        assert_eq!(profile.direction(), ProfileDirection::Input);
        assert_eq!(profile.mode(), Some(ProfileMode::UpdateOnly));
        assert_eq!(profile.rules().len(), 1);
        assert_eq!(profile.rules()[0].action_name(), "mapIdentity");
    }

    #[test]
    fn test_load_unknown_action_fails() {
        let mut doc = versioned_document();
        doc.rules.push(RuleDocument::new("true", "noSuchAction", vec![]));
        let err = input_loader().load(&doc).unwrap_err();
        assert!(matches!(err, LoadError::UnknownActionType { .. }));
    }

    #[test]
    fn test_load_bad_condition_fails() {
        let mut doc = versioned_document();
        doc.rules[0].condition.condition_value = "attr[".to_string();
        let err = input_loader().load(&doc).unwrap_err();
        assert!(matches!(err, LoadError::ExpressionCompile { .. }));
    }

    #[test]
    fn test_load_bad_arity_fails() {
        let mut doc = versioned_document();
        doc.rules[0].action.parameters.pop();
        let err = input_loader().load(&doc).unwrap_err();
        assert!(matches!(err, LoadError::InvalidParameterCount { .. }));
    }

    #[test]
    fn test_output_loader_rejects_input_action() {
        let loader = ProfileLoader::new(
            Arc::new(ActionRegistry::output_defaults()),
            test_environment(),
        );
        let err = loader.load(&versioned_document()).unwrap_err();
        // `mapIdentity` is not registered in the output registry at all.
        assert!(matches!(err, LoadError::UnknownActionType { .. }));
    }

    #[test]
    fn test_explicit_mode_survives_load() {
        let mut doc = versioned_document();
        doc.mode = Some(ProfileMode::UpdateAndRemoveMissing);
        let profile = input_loader().load(&doc).unwrap();
        assert_eq!(profile.mode(), Some(ProfileMode::UpdateAndRemoveMissing));
    }
}
