//! Global variable storage.
//!
//! Global variables outlive a single document (values set by the host
//! between runs). The contract is uniformly asynchronous so persistent
//! backends and the in-memory one look the same to the resolver.

use crate::models::VariableMap;
use async_trait::async_trait;
use std::sync::RwLock;

/// Errors raised by a storage backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The backend could not be reached
    Unavailable(String),

    /// The backend failed while serving a request
    Backend(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "Variable storage unavailable: {}", msg),
            StorageError::Backend(msg) => write!(f, "Variable storage error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Key/value store for global variables.
#[async_trait]
pub trait VariableStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// All stored variables, in insertion order.
    async fn get_all(&self) -> Result<VariableMap, StorageError>;

    /// Removes `key`, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

/// Process-local storage backed by an ordered map.
#[derive(Debug, Default)]
pub struct InMemoryVariableStorage {
    variables: RwLock<VariableMap>,
}

impl InMemoryVariableStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-filled with `variables`.
    pub fn with_variables<I, K, V>(variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            variables: RwLock::new(
                variables
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.variables.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VariableStorage for InMemoryVariableStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let variables = self.variables.read().unwrap_or_else(|p| p.into_inner());
        Ok(variables.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut variables = self.variables.write().unwrap_or_else(|p| p.into_inner());
        variables.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_all(&self) -> Result<VariableMap, StorageError> {
        let variables = self.variables.read().unwrap_or_else(|p| p.into_inner());
        Ok(variables.clone())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut variables = self.variables.write().unwrap_or_else(|p| p.into_inner());
        Ok(variables.shift_remove(key).is_some())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.variables
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
        Ok(())
    }
}
