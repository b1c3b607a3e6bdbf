//! Catalog of named actions and status effects.
//!
//! A rules provider fills a `Catalog` once at construction time and then
//! resolves names through it. Unknown names are an error, never a silent miss.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::action::{Action, StatusEffect};
use crate::error::{SimError, SimResult};

/// Name-keyed tables of actions and effects.
///
/// ## Example
///
/// ```
/// use rotation_search::core::{Action, Catalog, StatusEffect};
///
/// let mut catalog = Catalog::new();
/// let haste = catalog.add_effect(StatusEffect::timed("Haste", 20.0));
/// catalog.add_action(Action::new("Quicken").applies_buff(haste));
///
/// assert!(catalog.action("Quicken").is_ok());
/// assert!(catalog.action("Slow").is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    actions: FxHashMap<String, Arc<Action>>,
    effects: FxHashMap<String, Arc<StatusEffect>>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action, replacing any previous action with the same name.
    ///
    /// Returns the shared handle stored in the catalog.
    pub fn add_action(&mut self, action: Action) -> Arc<Action> {
        let action = Arc::new(action);
        self.actions.insert(action.name.clone(), Arc::clone(&action));
        action
    }

    /// Add an effect, replacing any previous effect with the same id.
    pub fn add_effect(&mut self, effect: StatusEffect) -> Arc<StatusEffect> {
        let effect = Arc::new(effect);
        self.effects.insert(effect.id.clone(), Arc::clone(&effect));
        effect
    }

    /// Look up an action by name.
    pub fn action(&self, name: &str) -> SimResult<&Arc<Action>> {
        self.actions.get(name).ok_or_else(|| SimError::ActionNotFound {
            name: name.to_string(),
        })
    }

    /// Look up an effect by id.
    pub fn effect(&self, id: &str) -> SimResult<&Arc<StatusEffect>> {
        self.effects.get(id).ok_or_else(|| SimError::EffectNotFound {
            name: id.to_string(),
        })
    }

    #[must_use]
    pub fn contains_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate over all actions (unordered).
    pub fn actions(&self) -> impl Iterator<Item = &Arc<Action>> {
        self.actions.values()
    }

    /// Iterate over all effects (unordered).
    pub fn effects(&self) -> impl Iterator<Item = &Arc<StatusEffect>> {
        self.effects.values()
    }

    /// Parse a rendered history such as `"Open > [Surge] > Follow"`.
    ///
    /// Brackets and surrounding whitespace are stripped from each token and
    /// empty tokens are skipped, so a trailing `" > "` is accepted.
    pub fn parse_history(&self, text: &str) -> SimResult<Vec<Arc<Action>>> {
        text.split('>')
            .map(|token| token.trim_matches(|c: char| c == '[' || c == ']' || c.is_whitespace()))
            .filter(|token| !token.is_empty())
            .map(|name| self.action(name).map(Arc::clone))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_action(Action::new("Open").on_main_cooldown(2.5));
        catalog.add_action(Action::new("Surge").with_cooldown(30.0));
        catalog.add_action(Action::new("Follow").on_main_cooldown(2.5));
        catalog
    }

    #[test]
    fn test_lookup() {
        let catalog = catalog();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.action("Surge").unwrap().name, "Surge");
        assert_eq!(
            catalog.action("Missing").unwrap_err(),
            SimError::ActionNotFound {
                name: "Missing".to_string()
            }
        );
        assert!(matches!(
            catalog.effect("Missing"),
            Err(SimError::EffectNotFound { .. })
        ));
    }

    #[test]
    fn test_replace_same_name() {
        let mut catalog = catalog();
        catalog.add_action(Action::new("Open").with_potency(999.0));

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.action("Open").unwrap().potency, 999.0);
    }

    #[test]
    fn test_parse_history() {
        let catalog = catalog();

        let actions = catalog.parse_history("Open > [Surge] > Follow > ").unwrap();
        let names: Vec<_> = actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Open", "Surge", "Follow"]);
    }

    #[test]
    fn test_parse_history_unknown_is_error() {
        let catalog = catalog();

        let err = catalog.parse_history("Open > [Teleport]").unwrap_err();
        assert_eq!(
            err,
            SimError::ActionNotFound {
                name: "Teleport".to_string()
            }
        );
    }
}
