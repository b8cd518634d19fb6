//! Persisted profile document model.
//!
//! The JSON tree an administrator's profile is stored as. The model
//! round-trips losslessly: rule ordering, action names, raw parameters and
//! condition text survive serialize/deserialize unchanged. A document
//! without a `ver` tag is a first-generation profile and goes through
//! [`crate::migration`] before loading.

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};
use crate::profile::ProfileMode;

/// Current profile document format version.
pub const PROFILE_FORMAT_VERSION: &str = "2";

/// A persisted translation profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    /// Format version; absent on legacy documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,

    /// Profile name; the tag applied to produced facts.
    pub name: String,

    /// Human description.
    #[serde(default)]
    pub description: String,

    /// Unmatched-fact handling mode (input profiles only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ProfileMode>,

    /// Rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<RuleDocument>,
}

impl ProfileDocument {
    /// Create an empty document at the current format version.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ver: Some(PROFILE_FORMAT_VERSION.to_string()),
            name: name.into(),
            description: String::new(),
            mode: None,
            rules: Vec::new(),
        }
    }

    /// Whether the document predates format versioning.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.ver.is_none()
    }

    /// Parse a persisted document from JSON text.
    pub fn from_json(text: &str) -> LoadResult<Self> {
        serde_json::from_str(text).map_err(|e| LoadError::malformed(e.to_string()))
    }

    /// Render the document as persisted JSON text.
    pub fn to_json(&self) -> LoadResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LoadError::malformed(e.to_string()))
    }
}

/// One persisted rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    /// The gating condition.
    pub condition: ConditionDocument,

    /// The action and its raw parameters.
    pub action: ActionDocument,
}

impl RuleDocument {
    /// Convenience constructor from parts.
    #[must_use]
    pub fn new(condition: impl Into<String>, action: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            condition: ConditionDocument {
                condition_value: condition.into(),
            },
            action: ActionDocument {
                name: action.into(),
                parameters,
            },
        }
    }
}

/// Persisted condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDocument {
    /// The condition expression text.
    #[serde(rename = "conditionValue")]
    pub condition_value: String,
}

/// Persisted action reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDocument {
    /// Registered action type name.
    pub name: String,

    /// Raw string parameters, in declared order.
    #[serde(default)]
    pub parameters: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> ProfileDocument {
        let mut doc = ProfileDocument::new("saml-uni-in");
        doc.description = "Inbound mapping for the university IdP".to_string();
        doc.mode = Some(ProfileMode::UpdateOnly);
        doc.rules.push(RuleDocument::new(
            "true",
            "mapIdentity",
            vec![
                "email".to_string(),
                "attr['mail']".to_string(),
                "cr-pass".to_string(),
                "CREATE_OR_MATCH".to_string(),
            ],
        ));
        doc.rules.push(RuleDocument::new(
            "attr['mail'] != ''",
            "mapGroup",
            vec!["'/staff'".to_string()],
        ));
        doc
    }

    #[test]
    fn test_roundtrip_preserves_everything() {
        let doc = sample_document();
        let text = serde_json::to_string_pretty(&doc).unwrap();
        let back: ProfileDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn test_wire_field_names() {
        let doc = sample_document();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["ver"], "2");
        assert_eq!(value["mode"], "UPDATE_ONLY");
        assert_eq!(
            value["rules"][0]["condition"]["conditionValue"],
            "true"
        );
        assert_eq!(value["rules"][0]["action"]["name"], "mapIdentity");
    }

    #[test]
    fn test_missing_ver_is_legacy() {
        let doc: ProfileDocument = serde_json::from_str(
            r#"{"name": "old", "rules": []}"#,
        )
        .unwrap();
        assert!(doc.is_legacy());
        assert!(doc.mode.is_none());
    }

    #[test]
    fn test_from_json_reports_malformed_documents() {
        let err = ProfileDocument::from_json("{not json").unwrap_err();
        assert!(matches!(err, LoadError::MalformedDocument { .. }));
    }

    #[test]
    fn test_json_helpers_roundtrip() {
        let doc = sample_document();
        let text = doc.to_json().unwrap();
        let back = ProfileDocument::from_json(&text).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn test_rule_order_preserved() {
        let doc = sample_document();
        let text = serde_json::to_string(&doc).unwrap();
        let back: ProfileDocument = serde_json::from_str(&text).unwrap();
        let names: Vec<_> = back.rules.iter().map(|r| r.action.name.as_str()).collect();
        assert_eq!(names, vec!["mapIdentity", "mapGroup"]);
    }
}
