//! Interactive fallback provider that asks the user for secret values.

use crate::secrets::types::{
    SecretError, SecretKind, SecretProvider, SecretProviderResult, SecretReference,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::IsTerminal;
use std::sync::Arc;

/// Asks for a value given a message. `None` means the user cancelled.
pub type PromptFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Prompts for secrets no other provider knows.
///
/// The prompt function is blocking and runs on tokio's blocking pool.
/// Answers are cached per `type:name` unless caching is turned off; an empty
/// or cancelled answer counts as "not found".
pub struct PromptSecretProvider {
    prompt: Option<PromptFn>,
    requires_terminal: bool,
    cache_prompts: bool,
    cache: DashMap<String, String>,
}

impl PromptSecretProvider {
    pub const NAME: &'static str = "prompt";

    /// Provider asking through `prompt`.
    pub fn new<F>(prompt: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            prompt: Some(Arc::new(prompt)),
            requires_terminal: false,
            cache_prompts: true,
            cache: DashMap::new(),
        }
    }

    /// Provider reading hidden input from the controlling terminal.
    ///
    /// It reports itself unavailable when stdin is not a terminal.
    pub fn terminal() -> Self {
        let prompt: PromptFn =
            Arc::new(|message: &str| rpassword::prompt_password(format!("{} ", message)).ok());
        Self {
            prompt: Some(prompt),
            requires_terminal: true,
            cache_prompts: true,
            cache: DashMap::new(),
        }
    }

    /// Provider with nothing to ask through; always unavailable.
    pub fn disabled() -> Self {
        Self {
            prompt: None,
            requires_terminal: false,
            cache_prompts: true,
            cache: DashMap::new(),
        }
    }

    pub fn with_cache(mut self, cache_prompts: bool) -> Self {
        self.cache_prompts = cache_prompts;
        self
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Forgets a cached answer under every reference type.
    pub fn remove_from_cache(&self, name: &str) {
        for kind in [SecretKind::Secret, SecretKind::Vault, SecretKind::OnePassword] {
            self.cache.remove(&format!("{}:{}", kind, name));
        }
    }
}

impl std::fmt::Debug for PromptSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSecretProvider")
            .field("has_prompt", &self.prompt.is_some())
            .field("requires_terminal", &self.requires_terminal)
            .field("cache_prompts", &self.cache_prompts)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[async_trait]
impl SecretProvider for PromptSecretProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Prompts user to enter secret values"
    }

    async fn is_available(&self) -> Result<bool, SecretError> {
        Ok(self.prompt.is_some() && (!self.requires_terminal || std::io::stdin().is_terminal()))
    }

    async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError> {
        let cache_key = reference.cache_key();
        if self.cache_prompts {
            if let Some(value) = self.cache.get(&cache_key) {
                return Ok(SecretProviderResult::found(value.as_str()));
            }
        }

        let Some(prompt) = self.prompt.clone() else {
            return Ok(SecretProviderResult::not_found_with("No prompt available"));
        };

        let message = format!("Enter value for secret \"{}\":", reference.display_name());
        let answer = tokio::task::spawn_blocking(move || prompt(&message))
            .await
            .map_err(|e| SecretError::Provider {
                provider: Self::NAME.to_string(),
                message: e.to_string(),
            })?;

        match answer {
            Some(value) if !value.is_empty() => {
                if self.cache_prompts {
                    self.cache.insert(cache_key, value.clone());
                }
                Ok(SecretProviderResult::found(value))
            }
            _ => Ok(SecretProviderResult::not_found_with(
                "User cancelled or provided empty value",
            )),
        }
    }
}
