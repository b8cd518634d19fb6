//! Collaborator traits.
//!
//! The engine never talks to the identity store or the attribute-type
//! subsystem directly; it resolves type names and converts raw remote
//! values through these seams. Implementations live in the hosting
//! product; the permissive implementations here back tests and
//! deployments without a typed attribute subsystem.

use crate::error::{ConversionError, ConversionResult};
use crate::ids::ProviderId;

/// Resolves local identity type names and converts raw remote values into
/// locally valid identity values.
pub trait IdentityTypeResolver: Send + Sync {
    /// Whether the identity type is declared.
    fn is_known(&self, identity_type: &str) -> bool;

    /// Convert a raw remote value into the local form of the identity type.
    ///
    /// `source_provider` and `profile` identify the origin of the value for
    /// types whose local form embeds provenance (e.g. targeted/persistent
    /// identifiers).
    fn convert_from_string(
        &self,
        identity_type: &str,
        raw: &str,
        source_provider: &ProviderId,
        profile: &str,
    ) -> ConversionResult<String>;
}

/// Resolves local attribute type names and converts raw values to the
/// attribute's declared value syntax.
pub trait AttributeTypeResolver: Send + Sync {
    /// Whether the attribute type is declared.
    fn is_known(&self, name: &str) -> bool;

    /// Convert a raw value to the attribute's declared value type.
    ///
    /// Fails with [`ConversionError::InvalidValueForType`] when the value
    /// is present but not convertible.
    fn convert_value(
        &self,
        attribute: &str,
        raw: &serde_json::Value,
    ) -> ConversionResult<serde_json::Value>;
}

/// Identity type resolver that accepts every type and passes values
/// through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveIdentityTypes;

impl IdentityTypeResolver for PermissiveIdentityTypes {
    fn is_known(&self, _identity_type: &str) -> bool {
        true
    }

    fn convert_from_string(
        &self,
        _identity_type: &str,
        raw: &str,
        _source_provider: &ProviderId,
        _profile: &str,
    ) -> ConversionResult<String> {
        Ok(raw.to_string())
    }
}

/// Attribute type resolver that accepts every attribute and value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveAttributeTypes;

impl AttributeTypeResolver for PermissiveAttributeTypes {
    fn is_known(&self, _name: &str) -> bool {
        true
    }

    fn convert_value(
        &self,
        _attribute: &str,
        raw: &serde_json::Value,
    ) -> ConversionResult<serde_json::Value> {
        Ok(raw.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_permissive_identity_passthrough() {
        let resolver = PermissiveIdentityTypes;
        assert!(resolver.is_known("anything"));
        let converted = resolver
            .convert_from_string("email", "a@b.org", &ProviderId::new("idp"), "profile-1")
            .unwrap();
        assert_eq!(converted, "a@b.org");
    }

    #[test]
    fn test_permissive_attribute_passthrough() {
        let resolver = PermissiveAttributeTypes;
        assert!(resolver.is_known("cn"));
        assert_eq!(resolver.convert_value("cn", &json!(42)).unwrap(), json!(42));
    }
}
