//! Snapshot types exchanged with protocol endpoints and the identity store.
//!
//! A [`RemoteInput`] is the read-only view of one authentication or
//! registration event as delivered by a SAML/OIDC/LDAP endpoint. A
//! [`LocalEntity`] is the symmetric view of local identity state consumed
//! by output profiles.

use serde::{Deserialize, Serialize};

use crate::ids::{GroupPath, ProviderId};

/// A single remote attribute with all of its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAttribute {
    /// Attribute name as asserted by the remote provider.
    pub name: String,

    /// All values, in assertion order.
    pub values: Vec<serde_json::Value>,
}

impl RemoteAttribute {
    /// Creates an attribute from a name and values.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Convenience constructor for a single string value.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![serde_json::Value::String(value.into())],
        }
    }
}

/// A remote identity asserted for the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// Remote identity type name (e.g. `eppn`, `subject-id`).
    pub identity_type: String,

    /// The identity value.
    pub value: String,

    /// Whether this is the primary identity of the assertion.
    #[serde(default)]
    pub primary: bool,
}

/// A remote group membership asserted for the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteGroupMembership {
    /// Group name as asserted by the remote provider.
    pub group: String,
}

/// Snapshot of one remote authentication/registration event.
///
/// Built by a protocol endpoint and handed to the engine; the engine never
/// mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteInput {
    /// The identity provider that produced the assertion.
    pub provider: ProviderId,

    /// All asserted attributes.
    #[serde(default)]
    pub attributes: Vec<RemoteAttribute>,

    /// All asserted identities.
    #[serde(default)]
    pub identities: Vec<RemoteIdentity>,

    /// All asserted group memberships.
    #[serde(default)]
    pub groups: Vec<RemoteGroupMembership>,
}

impl RemoteInput {
    /// Creates an empty input for the given provider.
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            attributes: Vec::new(),
            identities: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// The primary identity, if one was asserted.
    ///
    /// Falls back to the first identity when none is flagged primary.
    #[must_use]
    pub fn primary_identity(&self) -> Option<&RemoteIdentity> {
        self.identities
            .iter()
            .find(|i| i.primary)
            .or_else(|| self.identities.first())
    }
}

/// A local attribute of an entity, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAttribute {
    /// Local attribute type name.
    pub name: String,

    /// All values.
    pub values: Vec<serde_json::Value>,
}

/// A local identity of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// Local identity type name.
    pub identity_type: String,

    /// The identity value.
    pub value: String,
}

/// Snapshot of local entity state consumed by output profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalEntity {
    /// Attributes of the entity.
    #[serde(default)]
    pub attributes: Vec<LocalAttribute>,

    /// Identities of the entity.
    #[serde(default)]
    pub identities: Vec<LocalIdentity>,

    /// Group memberships of the entity.
    #[serde(default)]
    pub groups: Vec<GroupPath>,
}

/// Visibility of a produced attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeVisibility {
    /// Visible to the entity and exposable to relying parties.
    Full,
    /// Internal to the broker; never exposed outward.
    Local,
}

impl AttributeVisibility {
    /// Parses the wire form (`FULL` / `LOCAL`).
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "FULL" => Some(AttributeVisibility::Full),
            "LOCAL" => Some(AttributeVisibility::Local),
            _ => None,
        }
    }
}
