//! Secret resolution through the manager, the resolver and the session.

use async_trait::async_trait;
use httprex::parser::parse_request;
use httprex::secrets::{
    EnvSecretProvider, MemorySecretProvider, PromptSecretProvider, SecretError, SecretManager,
    SecretProvider, SecretProviderResult, SecretReference,
};
use httprex::variables::{VariableContext, VariableResolver};
use serial_test::serial;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Provider with a fixed name and a switchable availability flag.
struct StaticProvider {
    name: &'static str,
    available: AtomicBool,
    secrets: HashMap<String, String>,
    lookups: AtomicUsize,
}

impl StaticProvider {
    fn new(name: &'static str, secrets: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            name,
            available: AtomicBool::new(true),
            secrets: secrets
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            lookups: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SecretProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Fixed secrets for tests"
    }

    async fn is_available(&self) -> Result<bool, SecretError> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(match self.secrets.get(&reference.name) {
            Some(value) => SecretProviderResult::found(value.clone()),
            None => SecretProviderResult::not_found(),
        })
    }
}

/// Provider whose every lookup fails.
struct FailingProvider;

#[async_trait]
impl SecretProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn description(&self) -> &str {
        "Always errors"
    }

    async fn is_available(&self) -> Result<bool, SecretError> {
        Ok(true)
    }

    async fn get_secret(
        &self,
        _reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError> {
        Err(SecretError::Provider {
            provider: "failing".to_string(),
            message: "backend exploded".to_string(),
        })
    }
}

#[tokio::test]
async fn test_higher_priority_provider_wins() {
    let low = StaticProvider::new("low", &[("token", "A")]);
    let high = StaticProvider::new("high", &[("token", "B")]);

    let manager = SecretManager::new();
    manager.set_cache_enabled(false);
    manager.register_provider(low.clone(), 1);
    manager.register_provider(high.clone(), 10);

    let reference = SecretReference::parse("secret:token").unwrap();
    let result = manager.get_secret(&reference).await;
    assert_eq!(result.value.as_deref(), Some("B"));
    assert_eq!(result.provider.as_deref(), Some("high"));

    high.available.store(false, Ordering::SeqCst);
    let result = manager.get_secret(&reference).await;
    assert_eq!(result.value.as_deref(), Some("A"));
    assert_eq!(result.provider.as_deref(), Some("low"));
}

#[tokio::test]
async fn test_cache_serves_repeated_lookups() {
    let provider = StaticProvider::new("static", &[("token", "A")]);
    let manager = SecretManager::new();
    manager.register_provider(provider.clone(), 0);

    let reference = SecretReference::parse("vault:token").unwrap();
    for _ in 0..3 {
        assert!(manager.get_secret(&reference).await.found);
    }
    assert_eq!(provider.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(manager.cached_count(), 1);

    manager.clear_cache();
    assert!(manager.get_secret(&reference).await.found);
    assert_eq!(provider.lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failing_provider_falls_through() {
    let manager = SecretManager::new();
    manager.register_provider(Arc::new(FailingProvider), 100);
    manager.register_provider(
        Arc::new(MemorySecretProvider::with_secrets([("db-pass", "hunter2")])),
        0,
    );

    let result = manager
        .get_secret(&SecretReference::parse("secret:db-pass").unwrap())
        .await;
    assert_eq!(result.value.as_deref(), Some("hunter2"));

    let missing = manager
        .get_secret(&SecretReference::parse("secret:nope").unwrap())
        .await;
    assert!(!missing.found);
    assert_eq!(
        missing.error.as_deref(),
        Some("Secret \"nope\" not found in any provider")
    );
}

#[tokio::test]
async fn test_request_with_secret_header_resolves() {
    let manager = SecretManager::new();
    manager.register_provider(
        Arc::new(MemorySecretProvider::with_secrets([("api-token", "secret123")])),
        0,
    );
    let resolver = VariableResolver::new(VariableContext::new()).with_secret_manager(Arc::new(manager));

    let request = parse_request(
        "GET https://api.example.com/users\nAuthorization: Bearer {{secret:api-token}}",
    )
    .data
    .unwrap();

    let resolved = resolver.resolve_request_async(&request).await;
    assert_eq!(resolved.headers["authorization"], "Bearer secret123");
    assert_eq!(request.headers["authorization"], "Bearer {{secret:api-token}}");
}

#[tokio::test]
#[serial]
async fn test_env_provider_resolves_prefixed_names() {
    std::env::set_var("HTTPREX_IT_DEPLOY_KEY", "from-env");

    let manager = SecretManager::new();
    manager.register_provider(Arc::new(EnvSecretProvider::with_prefix("HTTPREX_")), 0);
    let resolver = VariableResolver::default().with_secret_manager(Arc::new(manager));

    let resolved = resolver.resolve_string_async("key={{secret:it-deploy-key}}").await;
    std::env::remove_var("HTTPREX_IT_DEPLOY_KEY");

    assert_eq!(resolved, "key=from-env");
}

#[tokio::test]
async fn test_prompt_provider_is_last_resort() {
    let asked = Arc::new(AtomicUsize::new(0));
    let counter = asked.clone();
    let prompt = PromptSecretProvider::new(move |_message: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some("typed-in".to_string())
    });

    let manager = SecretManager::new();
    manager.register_provider(Arc::new(prompt), 0);
    manager.register_provider(
        Arc::new(MemorySecretProvider::with_secrets([("known", "stored")])),
        10,
    );
    let resolver = VariableResolver::default().with_secret_manager(Arc::new(manager));

    assert_eq!(resolver.resolve_string_async("{{secret:known}}").await, "stored");
    assert_eq!(asked.load(Ordering::SeqCst), 0);

    assert_eq!(resolver.resolve_string_async("{{secret:unknown}}").await, "typed-in");
    assert_eq!(asked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresolved_secrets_are_listed() {
    let manager = SecretManager::new();
    manager.register_provider(
        Arc::new(MemorySecretProvider::with_secrets([("present", "x")])),
        0,
    );

    let unresolved = manager
        .get_unresolved_secrets(&["secret:present", "secret:absent", "plainVar", "op://Vault/Item/field"])
        .await;
    assert_eq!(unresolved, vec!["secret:absent", "op://Vault/Item/field"]);
}
