//! Explicit registry of rule providers.
//!
//! Providers are registered by name at startup and built on demand. The
//! search engine only ever sees an already-built provider.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::engine::RotationRules;
use crate::error::RegistryError;

/// Builds a fresh provider instance.
pub type RulesFactory = Box<dyn Fn() -> Arc<dyn RotationRules> + Send + Sync>;

/// Name-keyed provider factories.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use rotation_search::kits::SimpleKit;
/// use rotation_search::rules::RulesRegistry;
///
/// let mut registry = RulesRegistry::new();
/// registry
///     .register("simple", || Arc::new(SimpleKit::new()))
///     .unwrap();
///
/// let rules = registry.build("simple").unwrap();
/// assert!(registry.build("missing").is_err());
/// # let _ = rules;
/// ```
#[derive(Default)]
pub struct RulesRegistry {
    factories: FxHashMap<String, RulesFactory>,
}

impl RulesRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`. Names are unique.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Arc<dyn RotationRules> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Build the provider registered under `name`.
    pub fn build(&self, name: &str) -> Result<Arc<dyn RotationRules>, RegistryError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for RulesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesRegistry")
            .field("names", &self.names())
            .finish()
    }
}
