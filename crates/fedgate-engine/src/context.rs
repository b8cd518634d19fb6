//! Per-run binding context.
//!
//! A [`BindingContext`] is the flat, read-only variable environment that
//! conditions and value expressions evaluate against. It is built once per
//! profile execution, from a remote-input snapshot for input profiles or
//! from a local-entity snapshot for output profiles, and never mutated
//! afterwards.
//!
//! Exposed bindings:
//!
//! | name        | content                                              |
//! |-------------|------------------------------------------------------|
//! | `provider`  | identifier of the originating provider               |
//! | `attr`      | first value per attribute name                       |
//! | `attrs`     | all values per attribute name                        |
//! | `id`        | primary identity value (null when absent)            |
//! | `idType`    | primary identity type (null when absent)             |
//! | `idsByType` | identity values grouped by type                      |
//! | `groups`    | asserted group memberships                           |

use serde_json::{Map, Value};

use fedgate_core::{LocalEntity, ProviderId, RemoteInput};

/// Immutable variable environment for one profile execution.
#[derive(Debug, Clone)]
pub struct BindingContext {
    pub(crate) provider: ProviderId,
    pub(crate) attr: Map<String, Value>,
    pub(crate) attrs: Map<String, Value>,
    pub(crate) id: Option<String>,
    pub(crate) id_type: Option<String>,
    pub(crate) ids_by_type: Map<String, Value>,
    pub(crate) groups: Vec<String>,
}

impl BindingContext {
    /// Build the context for an input profile from a remote assertion.
    #[must_use]
    pub fn from_remote(input: &RemoteInput) -> Self {
        let mut attr = Map::new();
        let mut attrs = Map::new();
        for attribute in &input.attributes {
            if let Some(first) = attribute.values.first() {
                attr.entry(attribute.name.clone())
                    .or_insert_with(|| first.clone());
            }
            attrs
                .entry(attribute.name.clone())
                .or_insert_with(|| Value::Array(attribute.values.clone()));
        }

        let mut ids_by_type: Map<String, Value> = Map::new();
        for identity in &input.identities {
            let entry = ids_by_type
                .entry(identity.identity_type.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(Value::String(identity.value.clone()));
            }
        }

        let primary = input.primary_identity();

        Self {
            provider: input.provider.clone(),
            attr,
            attrs,
            id: primary.map(|i| i.value.clone()),
            id_type: primary.map(|i| i.identity_type.clone()),
            ids_by_type,
            groups: input.groups.iter().map(|g| g.group.clone()).collect(),
        }
    }

    /// Build the context for an output profile from local entity state.
    ///
    /// `provider` identifies the requesting relying party.
    #[must_use]
    pub fn from_entity(provider: ProviderId, entity: &LocalEntity) -> Self {
        let mut attr = Map::new();
        let mut attrs = Map::new();
        for attribute in &entity.attributes {
            if let Some(first) = attribute.values.first() {
                attr.entry(attribute.name.clone())
                    .or_insert_with(|| first.clone());
            }
            attrs
                .entry(attribute.name.clone())
                .or_insert_with(|| Value::Array(attribute.values.clone()));
        }

        let mut ids_by_type: Map<String, Value> = Map::new();
        for identity in &entity.identities {
            let entry = ids_by_type
                .entry(identity.identity_type.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(Value::String(identity.value.clone()));
            }
        }

        let primary = entity.identities.first();

        Self {
            provider,
            attr,
            attrs,
            id: primary.map(|i| i.value.clone()),
            id_type: primary.map(|i| i.identity_type.clone()),
            ids_by_type,
            groups: entity.groups.iter().map(|g| g.as_str().to_string()).collect(),
        }
    }

    /// The provider this context was built for.
    #[must_use]
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// First value of the named attribute, if present.
    #[must_use]
    pub fn single_value(&self, name: &str) -> Option<&Value> {
        self.attr.get(name)
    }

    /// Asserted group memberships.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }
}
