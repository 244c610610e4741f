//! Environment data models.
//!
//! An environment document looks like
//! `{ "$shared": {...}, "local": {...}, "staging": {...} }`. Every key other
//! than `$shared` becomes an [`Environment`] whose variables are the shared
//! ones overlaid with its own.

use crate::models::VariableMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reserved key holding variables merged into every environment.
pub const SHARED_KEY: &str = "$shared";

/// A named environment with its merged variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Environment name (e.g., "local", "staging", "production")
    pub name: String,

    /// Shared variables overlaid with the environment's own
    #[serde(default)]
    pub variables: VariableMap,

    /// Keys whose value comes from `$shared` (not overridden here)
    #[serde(default)]
    pub shared_variables: Vec<String>,
}

impl Environment {
    /// Creates an environment with no variables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: VariableMap::new(),
            shared_variables: Vec::new(),
        }
    }

    /// Merges `shared` and `own` into an environment; `own` wins on collision.
    pub fn merged(name: impl Into<String>, shared: &VariableMap, own: VariableMap) -> Self {
        let mut variables = shared.clone();
        let shared_variables = shared
            .keys()
            .filter(|key| !own.contains_key(*key))
            .cloned()
            .collect();
        variables.extend(own);

        Self {
            name: name.into(),
            variables,
            shared_variables,
        }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Whether `key` comes from `$shared`.
    pub fn is_shared(&self, key: &str) -> bool {
        self.shared_variables.iter().any(|shared| shared == key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// All environments of one loaded document, in document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Environments {
    /// Named environments, keyed by name
    #[serde(default)]
    pub environments: IndexMap<String, Environment>,

    /// The `$shared` block as written
    #[serde(default)]
    pub shared: VariableMap,
}

impl Environments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an environment.
    pub fn add_environment(&mut self, env: Environment) {
        self.environments.insert(env.name.clone(), env);
    }

    pub fn get_environment(&self, name: &str) -> Option<&Environment> {
        self.environments.get(name)
    }

    pub fn has_environment(&self, name: &str) -> bool {
        self.environments.contains_key(name)
    }

    /// Environment names in document order.
    pub fn list_environments(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    /// The first environment of the document.
    pub fn first(&self) -> Option<&Environment> {
        self.environments.values().next()
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}
