//! Action type registries.
//!
//! One registry exists per profile direction, built once at process start
//! from the full set of built-in action factories and treated as
//! read-only afterwards, so lookups never lock. Custom deployments may
//! register additional factories before the registry is shared.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::action::ActionFactory;
use crate::actions;
use crate::error::{LoadError, LoadResult};

/// Direction of a translation profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileDirection {
    /// Remote assertion to local facts.
    Input,
    /// Local entity state to outbound assertion.
    Output,
}

impl Display for ProfileDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileDirection::Input => write!(f, "input"),
            ProfileDirection::Output => write!(f, "output"),
        }
    }
}

/// Registry of action factories for one profile direction.
pub struct ActionRegistry {
    direction: ProfileDirection,
    factories: HashMap<&'static str, Arc<dyn ActionFactory>>,
}

impl ActionRegistry {
    /// Create an empty registry for the given direction.
    #[must_use]
    pub fn new(direction: ProfileDirection) -> Self {
        Self {
            direction,
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with all built-in input-direction actions.
    #[must_use]
    pub fn input_defaults() -> Self {
        let mut registry = Self::new(ProfileDirection::Input);
        registry.insert(Arc::new(actions::input::MapIdentityFactory));
        registry.insert(Arc::new(actions::input::MapAttributeFactory));
        registry.insert(Arc::new(actions::input::MapGroupFactory));
        registry.insert(Arc::new(actions::input::EntityChangeFactory));
        registry.insert(Arc::new(actions::input::AutoProcessFactory));
        registry.insert(Arc::new(actions::BreakFactory::input()));
        registry
    }

    /// Registry pre-populated with all built-in output-direction actions.
    #[must_use]
    pub fn output_defaults() -> Self {
        let mut registry = Self::new(ProfileDirection::Output);
        registry.insert(Arc::new(actions::output::CreateAttributeFactory));
        registry.insert(Arc::new(actions::output::CreateIdentityFactory));
        registry.insert(Arc::new(actions::BreakFactory::output()));
        registry
    }

    /// Direction this registry serves.
    #[must_use]
    pub fn direction(&self) -> ProfileDirection {
        self.direction
    }

    /// Register an additional factory.
    ///
    /// Fails with [`LoadError::IncompatibleActionType`] when the factory's
    /// direction disagrees with the registry's.
    pub fn register(&mut self, factory: Arc<dyn ActionFactory>) -> LoadResult<()> {
        if factory.direction() != self.direction {
            return Err(LoadError::IncompatibleActionType {
                action: factory.name().to_string(),
                expected: self.direction.to_string(),
                actual: factory.direction().to_string(),
            });
        }
        self.insert(factory);
        Ok(())
    }

    fn insert(&mut self, factory: Arc<dyn ActionFactory>) {
        debug_assert_eq!(factory.direction(), self.direction);
        self.factories.insert(factory.name(), factory);
    }

    /// Look up a factory by action type name.
    pub fn lookup(&self, name: &str) -> LoadResult<&Arc<dyn ActionFactory>> {
        self.factories
            .get(name)
            .ok_or_else(|| LoadError::UnknownActionType {
                name: name.to_string(),
                direction: self.direction.to_string(),
            })
    }

    /// Names of all registered action types, for the administrative UI.
    #[must_use]
    pub fn action_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_defaults_contain_builtins() {
        let registry = ActionRegistry::input_defaults();
        assert_eq!(registry.direction(), ProfileDirection::Input);
        for name in [
            "mapIdentity",
            "mapAttribute",
            "mapGroup",
            "entityChange",
            "autoProcess",
            "break",
        ] {
            assert!(registry.lookup(name).is_ok(), "missing builtin {name}");
        }
    }

    #[test]
    fn test_output_defaults_contain_builtins() {
        let registry = ActionRegistry::output_defaults();
        for name in ["createAttribute", "createIdentity", "break"] {
            assert!(registry.lookup(name).is_ok(), "missing builtin {name}");
        }
    }

    #[test]
    fn test_lookup_unknown_action() {
        let registry = ActionRegistry::input_defaults();
        let err = registry.lookup("noSuchAction").unwrap_err();
        assert!(matches!(err, LoadError::UnknownActionType { .. }));
        assert!(err.to_string().contains("noSuchAction"));
    }

    #[test]
    fn test_register_rejects_wrong_direction() {
        let mut registry = ActionRegistry::output_defaults();
        let err = registry
            .register(Arc::new(crate::actions::input::MapGroupFactory))
            .unwrap_err();
        assert!(matches!(err, LoadError::IncompatibleActionType { .. }));
    }

    #[test]
    fn test_action_names_sorted() {
        let registry = ActionRegistry::input_defaults();
        let names = registry.action_names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"mapIdentity"));
    }
}
