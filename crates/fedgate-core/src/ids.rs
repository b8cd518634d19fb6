//! Strongly Typed Identifiers
//!
//! Newtype wrappers for the string identifiers exchanged with external
//! collaborators. Using distinct types prevents accidentally passing a
//! group path where a provider identifier is expected at compile time.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Macro to define a strongly-typed string identifier.
macro_rules! define_string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_string_id!(
    /// Identifier of a remote identity provider (or, for output profiles,
    /// of the requesting relying party).
    ///
    /// # Example
    ///
    /// ```
    /// use fedgate_core::ProviderId;
    ///
    /// let idp = ProviderId::new("saml-university");
    /// assert_eq!(idp.as_str(), "saml-university");
    /// ```
    ProviderId
);

define_string_id!(
    /// Path of a local group, e.g. `/staff/faculty`.
    ///
    /// The engine treats paths as opaque; hierarchy semantics belong to
    /// the identity store.
    GroupPath
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_display() {
        let id = ProviderId::new("oidc-corp");
        assert_eq!(id.to_string(), "oidc-corp");
    }

    #[test]
    fn test_group_path_from_str() {
        let g: GroupPath = "/staff".into();
        assert_eq!(g.as_str(), "/staff");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ProviderId::new("ldap-main");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ldap-main\"");
    }

    #[test]
    fn test_serde_roundtrip() {
        let original = GroupPath::new("/projects/alpha");
        let json = serde_json::to_string(&original).unwrap();
        let back: GroupPath = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }

    #[test]
    fn test_can_use_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(GroupPath::new("/a"), 1);
        map.insert(GroupPath::new("/b"), 2);
        assert_eq!(map.get(&GroupPath::new("/a")), Some(&1));
    }
}
