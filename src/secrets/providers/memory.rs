//! In-process secret vault.

use crate::secrets::types::{SecretError, SecretProvider, SecretProviderResult, SecretReference};
use async_trait::async_trait;
use dashmap::DashMap;

/// Writable provider holding secrets in memory for the life of the process.
///
/// Lookups use the reference name, so `{{secret:x}}` and `{{vault:x}}` both
/// resolve to the entry `x`.
#[derive(Debug, Default)]
pub struct MemorySecretProvider {
    secrets: DashMap<String, String>,
}

impl MemorySecretProvider {
    pub const NAME: &'static str = "memory";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a vault pre-filled with `entries`.
    pub fn with_secrets<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let provider = Self::new();
        for (name, value) in entries {
            provider.insert(name, value);
        }
        provider
    }

    /// Stores a secret synchronously.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretProvider for MemorySecretProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "In-memory secret vault"
    }

    async fn is_available(&self) -> Result<bool, SecretError> {
        Ok(true)
    }

    async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError> {
        Ok(match self.secrets.get(&reference.name) {
            Some(value) => SecretProviderResult::found(value.as_str()),
            None => SecretProviderResult::not_found(),
        })
    }

    async fn list_secrets(&self) -> Result<Vec<String>, SecretError> {
        let mut names: Vec<String> = self.secrets.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn is_writable(&self) -> bool {
        true
    }

    async fn set_secret(&self, name: &str, value: &str) -> Result<(), SecretError> {
        self.insert(name, value);
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> Result<(), SecretError> {
        self.secrets.remove(name);
        Ok(())
    }
}
