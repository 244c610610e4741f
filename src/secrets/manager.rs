//! Priority-ordered secret resolution across registered providers.

use super::types::{SecretProvider, SecretProviderResult, SecretReference};
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Priority given to providers registered without one.
pub const DEFAULT_PRIORITY: i32 = 0;

#[derive(Clone)]
struct RegisteredProvider {
    provider: Arc<dyn SecretProvider>,
    priority: i32,
}

/// Resolves secret references by asking providers in priority order.
///
/// Providers are tried one at a time, highest priority first, ties broken by
/// registration order. The first provider that finds a secret wins and its
/// result is cached under `type:name`. Misses are never cached, so a provider
/// registered later can still answer.
///
/// The manager is meant to be shared as `Arc<SecretManager>`. The provider
/// list lock is only held to snapshot it, never across an `.await`.
pub struct SecretManager {
    providers: RwLock<Vec<RegisteredProvider>>,
    cache: DashMap<String, SecretProviderResult>,
    cache_enabled: AtomicBool,
}

impl SecretManager {
    /// Creates a manager with no providers and caching enabled.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            cache: DashMap::new(),
            cache_enabled: AtomicBool::new(true),
        }
    }

    /// Registers `provider` with `priority` (higher is tried first).
    ///
    /// A provider registered under an existing name replaces the old one and
    /// keeps its registration slot.
    pub fn register_provider(&self, provider: Arc<dyn SecretProvider>, priority: i32) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = RegisteredProvider { provider, priority };

        match providers
            .iter_mut()
            .find(|existing| existing.provider.name() == entry.provider.name())
        {
            Some(existing) => *existing = entry,
            None => providers.push(entry),
        }
    }

    /// Removes the provider registered as `name`. Returns `true` if one was removed.
    pub fn unregister_provider(&self, name: &str) -> bool {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = providers.len();
        providers.retain(|entry| entry.provider.name() != name);
        providers.len() != before
    }

    pub fn get_provider(&self, name: &str) -> Option<Arc<dyn SecretProvider>> {
        self.snapshot()
            .into_iter()
            .find(|entry| entry.provider.name() == name)
            .map(|entry| entry.provider)
    }

    /// Provider names in registration order.
    pub fn list_providers(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|entry| entry.provider.name().to_string())
            .collect()
    }

    fn snapshot(&self) -> Vec<RegisteredProvider> {
        self.providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn sorted_providers(&self) -> Vec<RegisteredProvider> {
        let mut providers = self.snapshot();
        // Stable, so equal priorities keep registration order
        providers.sort_by_key(|entry| Reverse(entry.priority));
        providers
    }

    /// Resolves `reference` through the providers.
    ///
    /// Never fails: unavailable and failing providers are skipped, and a
    /// secret found nowhere yields `found == false` with a descriptive error.
    pub async fn get_secret(&self, reference: &SecretReference) -> SecretProviderResult {
        let cache_key = reference.cache_key();

        if self.is_cache_enabled() {
            if let Some(cached) = self.cache.get(&cache_key) {
                log::debug!("Secret cache hit for {}", cache_key);
                return cached.clone();
            }
        }

        for entry in self.sorted_providers() {
            let provider = &entry.provider;

            match provider.is_available().await {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!("Secret provider {} is not available", provider.name());
                    continue;
                }
                Err(e) => {
                    log::debug!("Secret provider {} availability check failed: {}", provider.name(), e);
                    continue;
                }
            }

            match provider.get_secret(reference).await {
                Ok(mut result) if result.found => {
                    log::debug!("Secret {} resolved by {}", cache_key, provider.name());
                    result.provider = Some(provider.name().to_string());
                    if self.is_cache_enabled() {
                        self.cache.insert(cache_key, result.clone());
                    }
                    return result;
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Secret provider {} failed: {}", provider.name(), e);
                }
            }
        }

        SecretProviderResult::not_found_with(format!(
            "Secret \"{}\" not found in any provider",
            reference.name
        ))
    }

    /// Shorthand for [`SecretReference::parse`].
    pub fn parse_secret_reference(var_name: &str) -> Option<SecretReference> {
        SecretReference::parse(var_name)
    }

    pub fn is_secret_reference(var_name: &str) -> bool {
        SecretReference::parse(var_name).is_some()
    }

    /// Returns the names in `var_names` that are secret references no
    /// provider can resolve. Non-secret names are ignored.
    pub async fn get_unresolved_secrets<S: AsRef<str>>(&self, var_names: &[S]) -> Vec<String> {
        let mut unresolved = Vec::new();
        for var_name in var_names {
            let var_name = var_name.as_ref();
            if let Some(reference) = SecretReference::parse(var_name) {
                if !self.get_secret(&reference).await.found {
                    unresolved.push(var_name.to_string());
                }
            }
        }
        unresolved
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Enables or disables caching. Disabling also clears the cache.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.clear_cache();
        }
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::SeqCst)
    }

    /// Number of cached secrets.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

impl Default for SecretManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretManager")
            .field("providers", &self.list_providers())
            .field("cached", &self.cache.len())
            .field("cache_enabled", &self.is_cache_enabled())
            .finish()
    }
}
