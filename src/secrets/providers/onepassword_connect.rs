//! 1Password Connect server integration over its REST API.

use crate::secrets::types::{
    SecretError, SecretKind, SecretProvider, SecretProviderResult, SecretReference,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone)]
pub struct OnePasswordConnectConfig {
    /// Base URL of the Connect server, e.g. `http://localhost:8080`
    pub server_url: String,
    /// Connect access token
    pub token: String,
    /// Vault searched for plain (non `op://`) secret names
    pub default_vault_id: Option<String>,
    pub timeout_secs: u64,
}

impl OnePasswordConnectConfig {
    pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            default_vault_id: None,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for OnePasswordConnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnePasswordConnectConfig")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .field("default_vault_id", &self.default_vault_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Vault {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ItemSummary {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    fields: Vec<ItemField>,
}

#[derive(Debug, Deserialize)]
struct ItemField {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    purpose: Option<String>,
}

/// Resolves secrets through a 1Password Connect server.
///
/// `op://vault/item/field` references are resolved by vault name, item title
/// and field label (or id). Plain names are looked up as item titles in the
/// default vault and resolve to the password or first concealed field.
/// Vault name to id lookups are cached until [`clear_cache`](Self::clear_cache).
#[derive(Debug)]
pub struct OnePasswordConnectProvider {
    config: OnePasswordConnectConfig,
    client: reqwest::Client,
    vault_cache: DashMap<String, String>,
}

impl OnePasswordConnectProvider {
    pub const NAME: &'static str = "1password-connect";

    pub fn new(mut config: OnePasswordConnectConfig) -> Result<Self, SecretError> {
        config.server_url = config.server_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            vault_cache: DashMap::new(),
        })
    }

    pub fn clear_cache(&self) {
        self.vault_cache.clear();
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.config.server_url, path))
            .bearer_auth(&self.config.token)
            .header("Content-Type", "application/json")
    }

    async fn vault_id_by_name(&self, name: &str) -> Result<Option<String>, SecretError> {
        if let Some(id) = self.vault_cache.get(name) {
            return Ok(Some(id.clone()));
        }

        let response = self.get("/v1/vaults").send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }

        let vaults: Vec<Vault> = response.json().await?;
        let id = vaults
            .into_iter()
            .find(|vault| vault.name == name)
            .map(|vault| vault.id);
        if let Some(id) = &id {
            self.vault_cache.insert(name.to_string(), id.clone());
        }
        Ok(id)
    }

    async fn item_by_title(&self, vault_id: &str, title: &str) -> Result<Option<Item>, SecretError> {
        let response = self
            .get(&format!("/v1/vaults/{}/items", vault_id))
            .query(&[("filter", format!("title eq \"{}\"", title))])
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }

        let items: Vec<ItemSummary> = response.json().await?;
        let Some(summary) = items.into_iter().next() else {
            return Ok(None);
        };
        log::debug!("Found 1Password item '{}'", summary.title);

        let response = self
            .get(&format!("/v1/vaults/{}/items/{}", vault_id, summary.id))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    async fn get_by_path(&self, path: &str) -> Result<SecretProviderResult, SecretError> {
        let parts: Vec<&str> = path.split('/').collect();
        let [vault_name, item_name, field_path @ ..] = parts.as_slice() else {
            return Ok(invalid_path(path));
        };
        if field_path.is_empty() {
            return Ok(invalid_path(path));
        }
        let field_name = field_path.join("/");

        let Some(vault_id) = self.vault_id_by_name(vault_name).await? else {
            return Ok(SecretProviderResult::not_found_with(format!(
                "Vault \"{}\" not found",
                vault_name
            )));
        };

        let Some(item) = self.item_by_title(&vault_id, item_name).await? else {
            return Ok(SecretProviderResult::not_found_with(format!(
                "Item \"{}\" not found in vault \"{}\"",
                item_name, vault_name
            )));
        };

        let field = item
            .fields
            .into_iter()
            .find(|field| field.label == field_name || field.id == field_name);

        Ok(match field {
            Some(field) => SecretProviderResult::found(field.value.unwrap_or_default()),
            None => SecretProviderResult::not_found_with(format!(
                "Field \"{}\" not found in item \"{}\"",
                field_name, item_name
            )),
        })
    }

    async fn get_by_name(&self, name: &str) -> Result<SecretProviderResult, SecretError> {
        let Some(vault_id) = &self.config.default_vault_id else {
            return Ok(SecretProviderResult::not_found_with(
                "No default vault configured. Use op://vault/item/field format or set defaultVaultId.",
            ));
        };

        let Some(item) = self.item_by_title(vault_id, name).await? else {
            return Ok(SecretProviderResult::not_found());
        };

        let field = item.fields.into_iter().find(|field| {
            field.purpose.as_deref() == Some("PASSWORD") || field.kind == "CONCEALED"
        });

        Ok(match field {
            Some(field) => SecretProviderResult::found(field.value.unwrap_or_default()),
            None => SecretProviderResult::not_found_with("No secret field found in item"),
        })
    }
}

fn invalid_path(path: &str) -> SecretProviderResult {
    SecretProviderResult::not_found_with(format!(
        "Invalid 1Password path: {}. Expected format: vault/item/field",
        path
    ))
}

#[async_trait]
impl SecretProvider for OnePasswordConnectProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "1Password Connect Server integration"
    }

    async fn is_available(&self) -> Result<bool, SecretError> {
        match self.get("/health").send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                log::debug!("1Password Connect health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError> {
        let result = match (&reference.kind, &reference.path) {
            (SecretKind::OnePassword, Some(path)) => self.get_by_path(path).await,
            _ => self.get_by_name(&reference.name).await,
        };

        Ok(result.unwrap_or_else(|e| {
            SecretProviderResult::not_found_with(format!("1Password Connect error: {}", e))
        }))
    }

    async fn list_secrets(&self) -> Result<Vec<String>, SecretError> {
        let Some(vault_id) = &self.config.default_vault_id else {
            return Ok(Vec::new());
        };

        let response = match self.get(&format!("/v1/vaults/{}/items", vault_id)).send().await {
            Ok(response) if response.status().is_success() => response,
            _ => return Ok(Vec::new()),
        };
        let items: Vec<ItemSummary> = response.json().await.unwrap_or_default();
        Ok(items.into_iter().map(|item| item.title).collect())
    }
}
