//! Translation result accumulator.
//!
//! One [`TranslationResult`] is owned exclusively by one profile run.
//! Actions append their effects; nothing ever retracts a prior rule's
//! contribution, and duplicate-looking entries are kept; reconciliation
//! and de-duplication belong to the identity store. The single exception
//! is the automatic request disposition, where the last rule to set it
//! wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fedgate_core::{AttributeVisibility, GroupPath};

/// Policy governing whether a mapped identity is created, matched, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityEffectMode {
    /// Match an existing entity; create one when no match exists.
    CreateOrMatch,
    /// Create only; an existing match is left untouched.
    CreateOnly,
    /// Match only; never create.
    MatchOnly,
    /// Match must succeed; a missing match fails the event.
    RequireMatch,
}

impl IdentityEffectMode {
    /// Parses the wire form (`CREATE_OR_MATCH`, ...).
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "CREATE_OR_MATCH" => Some(IdentityEffectMode::CreateOrMatch),
            "CREATE_ONLY" => Some(IdentityEffectMode::CreateOnly),
            "MATCH_ONLY" => Some(IdentityEffectMode::MatchOnly),
            "REQUIRE_MATCH" => Some(IdentityEffectMode::RequireMatch),
            _ => None,
        }
    }

    /// All wire forms, for parameter metadata.
    #[must_use]
    pub fn wire_forms() -> &'static [&'static str] {
        &[
            "CREATE_OR_MATCH",
            "CREATE_ONLY",
            "MATCH_ONLY",
            "REQUIRE_MATCH",
        ]
    }
}

/// A scheduled entity status operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatusOperation {
    /// Disable the entity.
    Disable,
    /// Remove the entity.
    Remove,
}

impl EntityStatusOperation {
    /// Parses the wire form (`DISABLE` / `REMOVE`).
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "DISABLE" => Some(EntityStatusOperation::Disable),
            "REMOVE" => Some(EntityStatusOperation::Remove),
            _ => None,
        }
    }

    /// All wire forms, for parameter metadata.
    #[must_use]
    pub fn wire_forms() -> &'static [&'static str] {
        &["DISABLE", "REMOVE"]
    }
}

/// Automatic disposition of the registration request (input profiles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomaticRequestAction {
    /// Accept the request without operator review.
    Accept,
    /// Reject the request.
    Reject,
    /// Drop the request silently.
    Drop,
}

impl AutomaticRequestAction {
    /// Parses the wire form (`accept` / `reject` / `drop`).
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "accept" => Some(AutomaticRequestAction::Accept),
            "reject" => Some(AutomaticRequestAction::Reject),
            "drop" => Some(AutomaticRequestAction::Drop),
            _ => None,
        }
    }

    /// All wire forms, for parameter metadata.
    #[must_use]
    pub fn wire_forms() -> &'static [&'static str] {
        &["accept", "reject", "drop"]
    }
}

/// One produced identity mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityMapping {
    /// How the store should apply this mapping.
    pub effect: IdentityEffectMode,

    /// Local identity type name.
    pub identity_type: String,

    /// The converted identity value.
    pub value: String,

    /// Credential requirement to attach when the mapping creates an
    /// entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_requirement: Option<String>,
}

/// One produced attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedAttribute {
    /// Local attribute type name.
    pub name: String,

    /// Group scope of the attribute.
    pub group: GroupPath,

    /// Visibility of the attribute.
    pub visibility: AttributeVisibility,

    /// All produced values, converted to the declared value type.
    pub values: Vec<serde_json::Value>,

    /// Name of the profile that produced the attribute.
    pub source_profile: String,
}

/// One produced group membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedGroup {
    /// The local group.
    pub group: GroupPath,

    /// Name of the profile that produced the membership.
    pub source_profile: String,
}

/// One scheduled entity lifecycle change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEntityChange {
    /// The operation to perform.
    pub operation: EntityStatusOperation,

    /// When the operation becomes effective.
    pub effective_at: DateTime<Utc>,
}

/// Accumulator of all effects produced by one profile run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Produced identity mappings.
    pub identities: Vec<IdentityMapping>,

    /// Produced attributes.
    pub attributes: Vec<MappedAttribute>,

    /// Produced group memberships.
    pub groups: Vec<MappedGroup>,

    /// Scheduled entity lifecycle changes.
    pub entity_changes: Vec<ScheduledEntityChange>,

    /// Automatic request disposition; last rule to set it wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_action: Option<AutomaticRequestAction>,
}

impl TranslationResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an identity mapping.
    pub fn add_identity(&mut self, mapping: IdentityMapping) {
        self.identities.push(mapping);
    }

    /// Append an attribute.
    pub fn add_attribute(&mut self, attribute: MappedAttribute) {
        self.attributes.push(attribute);
    }

    /// Append a group membership.
    pub fn add_group(&mut self, group: MappedGroup) {
        self.groups.push(group);
    }

    /// Append a scheduled entity change.
    pub fn add_entity_change(&mut self, change: ScheduledEntityChange) {
        self.entity_changes.push(change);
    }

    /// Set the automatic request disposition; overwrites a prior value.
    pub fn set_auto_action(&mut self, action: AutomaticRequestAction) {
        self.auto_action = Some(action);
    }

    /// Whether the run produced no effects at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
            && self.attributes.is_empty()
            && self.groups.is_empty()
            && self.entity_changes.is_empty()
            && self.auto_action.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_appends_preserve_duplicates() {
        let mut result = TranslationResult::new();
        let mapping = IdentityMapping {
            effect: IdentityEffectMode::CreateOrMatch,
            identity_type: "email".to_string(),
            value: "a@b.org".to_string(),
            credential_requirement: None,
        };
        result.add_identity(mapping.clone());
        result.add_identity(mapping);
        assert_eq!(result.identities.len(), 2);
    }

    #[test]
    fn test_auto_action_last_write_wins() {
        let mut result = TranslationResult::new();
        result.set_auto_action(AutomaticRequestAction::Reject);
        result.set_auto_action(AutomaticRequestAction::Accept);
        assert_eq!(result.auto_action, Some(AutomaticRequestAction::Accept));
    }

    #[test]
    fn test_is_empty() {
        let mut result = TranslationResult::new();
        assert!(result.is_empty());
        result.add_group(MappedGroup {
            group: GroupPath::new("/staff"),
            source_profile: "p".to_string(),
        });
        assert!(!result.is_empty());
    }

    #[test]
    fn test_effect_mode_wire_forms() {
        assert_eq!(
            IdentityEffectMode::from_wire("CREATE_OR_MATCH"),
            Some(IdentityEffectMode::CreateOrMatch)
        );
        assert_eq!(IdentityEffectMode::from_wire("create_or_match"), None);
        for form in IdentityEffectMode::wire_forms() {
            assert!(IdentityEffectMode::from_wire(form).is_some());
        }
    }

    #[test]
    fn test_result_serializes() {
        let mut result = TranslationResult::new();
        result.add_attribute(MappedAttribute {
            name: "cn".to_string(),
            group: GroupPath::new("/"),
            visibility: AttributeVisibility::Full,
            values: vec![json!("Jane")],
            source_profile: "profile-1".to_string(),
        });
        let text = serde_json::to_string(&result).unwrap();
        let back: TranslationResult = serde_json::from_str(&text).unwrap();
        assert_eq!(result, back);
    }
}
