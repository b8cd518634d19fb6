//! Legacy profile migration.
//!
//! First-generation profiles predate format versioning and use a fixed
//! action vocabulary driven by three trigger actions (`createUser`,
//! `updateAttributes`, `updateGroups`). Migration rewrites such a document
//! into the current generalized vocabulary, best effort: it never fails
//! the load, and every non-mechanical decision is recorded as a warning
//! for manual review. Callers persist the upgraded document so migration
//! runs at most once per profile.

use std::fmt::{Display, Formatter};

use tracing::warn;

use crate::document::{ProfileDocument, RuleDocument, PROFILE_FORMAT_VERSION};
use crate::result::IdentityEffectMode;

/// Identity type used when the original type information is lost.
const LEGACY_IDENTIFIER_TYPE: &str = "identifier";

/// One non-mechanical migration decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationWarning {
    /// Index of the legacy rule the decision concerns, when applicable.
    pub rule_index: Option<usize>,

    /// Human-readable description.
    pub message: String,
}

impl MigrationWarning {
    fn new(rule_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            rule_index,
            message: message.into(),
        }
    }
}

impl Display for MigrationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.rule_index {
            Some(index) => write!(f, "rule {}: {}", index, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Result of migrating one document.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    /// The upgraded (or unchanged) document.
    pub document: ProfileDocument,

    /// All recorded decisions.
    pub warnings: Vec<MigrationWarning>,

    /// Whether the document was rewritten.
    pub changed: bool,
}

/// Conditions recovered from the trigger rules in the first pass.
#[derive(Default)]
struct TriggerConditions {
    create_user: Option<String>,
    update_attributes: Option<String>,
    update_groups: Option<String>,
}

/// Migrate a profile document to the current format.
///
/// A document already carrying a version tag is returned unchanged;
/// migration is idempotent on its output.
pub fn migrate_document(doc: &ProfileDocument) -> MigrationOutcome {
    if !doc.is_legacy() {
        return MigrationOutcome {
            document: doc.clone(),
            warnings: Vec::new(),
            changed: false,
        };
    }

    let mut warnings = Vec::new();

    // Pass 1: recover the condition associated with each trigger action.
    // Last seen wins; collapsing duplicates is a known compatibility
    // ambiguity and is surfaced rather than silent.
    let mut triggers = TriggerConditions::default();
    let mut seen_at: [Option<usize>; 3] = [None; 3];
    for (index, rule) in doc.rules.iter().enumerate() {
        let (slot, name) = match rule.action.name.as_str() {
            "createUser" => (0usize, &mut triggers.create_user),
            "updateAttributes" => (1, &mut triggers.update_attributes),
            "updateGroups" => (2, &mut triggers.update_groups),
            _ => continue,
        };
        if let Some(earlier) = seen_at[slot] {
            warnings.push(MigrationWarning::new(
                Some(index),
                format!(
                    "duplicate '{}' trigger; condition of rule {} is discarded",
                    rule.action.name, earlier
                ),
            ));
        }
        seen_at[slot] = Some(index);
        *name = Some(rule.condition.condition_value.clone());
    }

    // Pass 2: emit zero-or-one new rule per legacy rule.
    let mut rules = Vec::new();
    for (index, rule) in doc.rules.iter().enumerate() {
        let params = &rule.action.parameters;
        match rule.action.name.as_str() {
            // Trigger rules only donate conditions.
            "createUser" | "updateAttributes" | "updateGroups" => {}

            "mapIdentity" => {
                if let Some(condition) = require_trigger(
                    &triggers.create_user,
                    "createUser",
                    index,
                    &rule.action.name,
                    &mut warnings,
                ) {
                    warnings.push(MigrationWarning::new(
                        Some(index),
                        "primary identity mapped to generic 'identifier' type",
                    ));
                    rules.push(RuleDocument::new(
                        condition,
                        "mapIdentity",
                        vec![
                            LEGACY_IDENTIFIER_TYPE.to_string(),
                            "id".to_string(),
                            params.first().cloned().unwrap_or_default(),
                            migrate_effect(params.get(1), index, &mut warnings),
                        ],
                    ));
                }
            }

            "mapIdentityByType" => {
                let Some(id_type) = params.first() else {
                    warnings.push(MigrationWarning::new(
                        Some(index),
                        "mapIdentityByType without a type parameter; skipped",
                    ));
                    continue;
                };
                if let Some(condition) = require_trigger(
                    &triggers.create_user,
                    "createUser",
                    index,
                    &rule.action.name,
                    &mut warnings,
                ) {
                    warnings.push(MigrationWarning::new(
                        Some(index),
                        format!(
                            "identities of remote type '{id_type}' mapped to generic \
                             'identifier' type; original type information is lost"
                        ),
                    ));
                    rules.push(RuleDocument::new(
                        condition,
                        "mapIdentity",
                        vec![
                            LEGACY_IDENTIFIER_TYPE.to_string(),
                            format!("idsByType['{id_type}']"),
                            params.get(1).cloned().unwrap_or_default(),
                            migrate_effect(params.get(2), index, &mut warnings),
                        ],
                    ));
                }
            }

            "mapAttributeToIdentity" => {
                let Some(attribute) = params.first() else {
                    warnings.push(MigrationWarning::new(
                        Some(index),
                        "mapAttributeToIdentity without an attribute parameter; skipped",
                    ));
                    continue;
                };
                if let Some(condition) = require_trigger(
                    &triggers.create_user,
                    "createUser",
                    index,
                    &rule.action.name,
                    &mut warnings,
                ) {
                    warnings.push(MigrationWarning::new(
                        Some(index),
                        format!(
                            "attribute '{attribute}' mapped to generic 'identifier' type"
                        ),
                    ));
                    rules.push(RuleDocument::new(
                        condition,
                        "mapIdentity",
                        vec![
                            LEGACY_IDENTIFIER_TYPE.to_string(),
                            format!("attr['{attribute}']"),
                            params.get(1).cloned().unwrap_or_default(),
                            migrate_effect(params.get(2), index, &mut warnings),
                        ],
                    ));
                }
            }

            "mapAttribute" => {
                if params.len() < 3 {
                    warnings.push(MigrationWarning::new(
                        Some(index),
                        "mapAttribute with fewer than 3 parameters; skipped",
                    ));
                    continue;
                }
                if let Some(condition) = require_trigger(
                    &triggers.update_attributes,
                    "updateAttributes",
                    index,
                    &rule.action.name,
                    &mut warnings,
                ) {
                    let local = &params[0];
                    let remote = if params[1] == "$1" {
                        warnings.push(MigrationWarning::new(
                            Some(index),
                            format!("'$1' self-reference resolved to '{local}'"),
                        ));
                        local
                    } else {
                        &params[1]
                    };
                    rules.push(RuleDocument::new(
                        condition,
                        "mapAttribute",
                        vec![
                            local.clone(),
                            params[2].clone(),
                            format!("attr['{remote}']"),
                            migrate_visibility(params.get(3), index, &mut warnings),
                        ],
                    ));
                }
            }

            "mapGroup" => {
                let Some(remote) = params.first() else {
                    warnings.push(MigrationWarning::new(
                        Some(index),
                        "mapGroup without parameters; skipped",
                    ));
                    continue;
                };
                if let Some(condition) = require_trigger(
                    &triggers.update_groups,
                    "updateGroups",
                    index,
                    &rule.action.name,
                    &mut warnings,
                ) {
                    let local = match params.get(1) {
                        Some(local) if local != "$1" => local.clone(),
                        _ => {
                            warnings.push(MigrationWarning::new(
                                Some(index),
                                format!("group name guessed from remote group '{remote}'"),
                            ));
                            remote.clone()
                        }
                    };
                    rules.push(RuleDocument::new(
                        condition,
                        "mapGroup",
                        vec![format!("'{local}'")],
                    ));
                }
            }

            other => {
                warnings.push(MigrationWarning::new(
                    Some(index),
                    format!("unknown legacy action '{other}'; skipped"),
                ));
            }
        }
    }

    for warning in &warnings {
        warn!(profile = %doc.name, warning = %warning, "Legacy profile migration");
    }

    let mut document = doc.clone();
    document.ver = Some(PROFILE_FORMAT_VERSION.to_string());
    document.rules = rules;

    MigrationOutcome {
        document,
        warnings,
        changed: true,
    }
}

/// Resolve the trigger condition a generated rule reuses, warning when the
/// legacy profile never declared the trigger.
fn require_trigger(
    condition: &Option<String>,
    trigger: &str,
    index: usize,
    action: &str,
    warnings: &mut Vec<MigrationWarning>,
) -> Option<String> {
    if condition.is_none() {
        warnings.push(MigrationWarning::new(
            Some(index),
            format!("'{action}' has no matching '{trigger}' trigger; skipped"),
        ));
    }
    condition.clone()
}

/// Carry over a legacy effect-mode parameter, falling back to
/// CREATE_OR_MATCH when absent or unparseable.
fn migrate_effect(
    raw: Option<&String>,
    index: usize,
    warnings: &mut Vec<MigrationWarning>,
) -> String {
    match raw {
        None => "CREATE_OR_MATCH".to_string(),
        Some(value) if IdentityEffectMode::from_wire(value).is_some() => value.clone(),
        Some(value) => {
            warnings.push(MigrationWarning::new(
                Some(index),
                format!("unknown effect mode '{value}'; using CREATE_OR_MATCH"),
            ));
            "CREATE_OR_MATCH".to_string()
        }
    }
}

/// Carry over a legacy visibility parameter, falling back to FULL.
fn migrate_visibility(
    raw: Option<&String>,
    index: usize,
    warnings: &mut Vec<MigrationWarning>,
) -> String {
    match raw {
        None => "FULL".to_string(),
        Some(value) if value == "FULL" || value == "LOCAL" => value.clone(),
        Some(value) => {
            warnings.push(MigrationWarning::new(
                Some(index),
                format!("unknown visibility '{value}'; using FULL"),
            ));
            "FULL".to_string()
        }
    }
}
