//! 1Password integration through the `op` command line tool.

use crate::secrets::types::{
    SecretError, SecretKind, SecretProvider, SecretProviderResult, SecretReference,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;

/// Environment variable `op` reads a service account token from.
const SERVICE_ACCOUNT_TOKEN_VAR: &str = "OP_SERVICE_ACCOUNT_TOKEN";

#[derive(Debug, Clone)]
pub struct OnePasswordCliConfig {
    /// Path or name of the `op` binary
    pub op_path: String,
    /// Service account token; the current `op` session is used when unset
    pub service_account_token: Option<String>,
}

impl Default for OnePasswordCliConfig {
    fn default() -> Self {
        Self {
            op_path: "op".to_string(),
            service_account_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemSummary {
    title: String,
}

/// Resolves secrets by running `op`.
///
/// `op://vault/item/field` references are read with `op read`; plain names
/// are looked up as item titles and resolve to the item's password field.
#[derive(Debug, Clone, Default)]
pub struct OnePasswordCliProvider {
    config: OnePasswordCliConfig,
}

impl OnePasswordCliProvider {
    pub const NAME: &'static str = "1password-cli";

    pub fn new(config: OnePasswordCliConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to `op` to resolve `reference`.
    pub fn command_args(reference: &SecretReference) -> Vec<String> {
        match (&reference.kind, &reference.path) {
            (SecretKind::OnePassword, Some(path)) => {
                vec!["read".to_string(), format!("op://{}", path)]
            }
            _ => vec![
                "item".to_string(),
                "get".to_string(),
                reference.name.clone(),
                "--fields".to_string(),
                "password".to_string(),
                "--format=json".to_string(),
            ],
        }
    }

    /// Runs `op` and returns its stdout; a non-zero exit becomes an error
    /// carrying stderr.
    async fn run(&self, args: &[String]) -> Result<String, SecretError> {
        let mut command = Command::new(&self.config.op_path);
        command.args(args).kill_on_drop(true);
        if let Some(token) = &self.config.service_account_token {
            command.env(SERVICE_ACCOUNT_TOKEN_VAR, token);
        }

        let output = command.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("op exited with {}", output.status)
            } else {
                stderr
            };
            return Err(SecretError::Provider {
                provider: Self::NAME.to_string(),
                message,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extracts the secret from `op item get --format=json` output.
///
/// Falls back to the trimmed raw output when it is not the expected JSON.
pub fn parse_item_output(output: &str) -> String {
    match serde_json::from_str::<Value>(output) {
        Ok(Value::Object(fields)) => match fields.get("value") {
            Some(Value::String(value)) => value.clone(),
            Some(other) => other.to_string(),
            None => output.trim().to_string(),
        },
        Ok(Value::String(value)) => value,
        _ => output.trim().to_string(),
    }
}

/// Item titles from `op item list --format=json` output.
///
/// Output that is not the expected JSON array is logged and yields no titles.
pub fn parse_item_list(output: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<ItemSummary>>(output) {
        Ok(items) => items.into_iter().map(|item| item.title).collect(),
        Err(e) => {
            log::warn!("Could not parse 1Password item list: {}", e);
            Vec::new()
        }
    }
}

/// Maps an `op` failure to a "not found" result with a readable message.
pub fn describe_failure(reference: &SecretReference, message: &str) -> SecretProviderResult {
    let lower = message.to_lowercase();
    let error = if lower.contains("not found") || lower.contains("no item") {
        format!("Item \"{}\" not found in 1Password", reference.name)
    } else if lower.contains("not signed in") {
        "1Password CLI not signed in. Run \"op signin\" first.".to_string()
    } else {
        format!("1Password CLI error: {}", message)
    };
    SecretProviderResult::not_found_with(error)
}

#[async_trait]
impl SecretProvider for OnePasswordCliProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "1Password CLI (op) integration"
    }

    async fn is_available(&self) -> Result<bool, SecretError> {
        let args = ["whoami".to_string(), "--format=json".to_string()];
        match self.run(&args).await {
            Ok(output) => Ok(output.contains("account")),
            Err(e) => {
                log::debug!("1Password CLI unavailable: {}", e);
                Ok(false)
            }
        }
    }

    async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError> {
        let args = Self::command_args(reference);
        let is_read = args.first().map(String::as_str) == Some("read");

        match self.run(&args).await {
            Ok(output) if is_read => Ok(SecretProviderResult::found(output.trim())),
            Ok(output) => Ok(SecretProviderResult::found(parse_item_output(&output))),
            Err(SecretError::Provider { message, .. }) => Ok(describe_failure(reference, &message)),
            Err(e) => Ok(describe_failure(reference, &e.to_string())),
        }
    }

    async fn list_secrets(&self) -> Result<Vec<String>, SecretError> {
        let args = ["item".to_string(), "list".to_string(), "--format=json".to_string()];
        let output = match self.run(&args).await {
            Ok(output) => output,
            Err(e) => {
                log::debug!("Listing 1Password items failed: {}", e);
                return Ok(Vec::new());
            }
        };
        Ok(parse_item_list(&output))
    }
}
