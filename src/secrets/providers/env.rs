//! Process environment secret provider.

use crate::secrets::types::{SecretError, SecretProvider, SecretProviderResult, SecretReference};
use async_trait::async_trait;

/// Reads secrets from process environment variables.
///
/// For a reference named `api-token` the provider tries `api-token` first,
/// then the prefixed UPPER_SNAKE form, e.g. `HTTPREX_API_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretProvider {
    prefix: String,
}

impl EnvSecretProvider {
    pub const NAME: &'static str = "env";

    /// Provider without a prefix: `api-token` also matches `API_TOKEN`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Variable names tried for `reference`, in order.
    pub fn candidate_names(&self, reference: &SecretReference) -> Vec<String> {
        let name = reference.display_name();
        let normalized = format!("{}{}", self.prefix, to_upper_snake(name));

        let mut candidates = vec![name.to_string()];
        if normalized != name {
            candidates.push(normalized);
        }
        candidates
    }
}

fn to_upper_snake(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Process environment variables"
    }

    async fn is_available(&self) -> Result<bool, SecretError> {
        Ok(true)
    }

    async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError> {
        for candidate in self.candidate_names(reference) {
            if let Ok(value) = std::env::var(&candidate) {
                log::debug!("Secret {} read from ${}", reference, candidate);
                return Ok(SecretProviderResult::found(value));
            }
        }
        Ok(SecretProviderResult::not_found())
    }

    async fn list_secrets(&self) -> Result<Vec<String>, SecretError> {
        if self.prefix.is_empty() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = std::env::vars()
            .filter_map(|(key, _)| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }
}
