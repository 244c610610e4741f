//! Configuration schema.
//!
//! This module defines the configuration structure and validation logic for
//! every user-configurable setting: environment selection, secret caching and
//! which secret providers a session registers.

use serde::{Deserialize, Serialize};

/// Main configuration structure.
///
/// Settings live under the `"httprex"` key of a settings document. Missing
/// settings fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttprexConfig {
    /// Path to the environment file.
    ///
    /// Relative paths are resolved against the workspace. When unset, the
    /// workspace and up to 3 parent directories are searched for
    /// `.http-client-env.json` or `http-client.env.json`.
    #[serde(default)]
    pub environment_file: Option<String>,

    /// Environment selected after loading.
    #[serde(default)]
    pub default_environment: Option<String>,

    /// Select the first environment when no default is configured.
    ///
    /// Defaults to false.
    #[serde(default = "default_auto_select_environment")]
    pub auto_select_environment: bool,

    /// Cache resolved secrets for the life of the session. Defaults to true.
    #[serde(default = "default_secret_cache")]
    pub secret_cache: bool,

    /// Secret providers to register.
    #[serde(default)]
    pub secrets: SecretsConfig,
}

/// Which secret providers are registered, highest priority first:
/// 1Password Connect, 1Password CLI, process environment, prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsConfig {
    /// Resolve secrets from process environment variables. Defaults to true.
    #[serde(default = "default_process_env")]
    pub process_env: bool,

    /// Prefix tried with the UPPER_SNAKE form of a secret name.
    ///
    /// With the default `HTTPREX_`, `{{secret:api-token}}` also checks
    /// `HTTPREX_API_TOKEN`.
    #[serde(default = "default_process_env_prefix")]
    pub process_env_prefix: String,

    /// Ask on the terminal for secrets nothing else resolved. Defaults to false.
    #[serde(default)]
    pub prompt: bool,

    /// 1Password CLI (`op`) settings; disabled when absent.
    #[serde(default)]
    pub one_password_cli: Option<OnePasswordCliSettings>,

    /// 1Password Connect settings; disabled when absent.
    #[serde(default)]
    pub one_password_connect: Option<OnePasswordConnectSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnePasswordCliSettings {
    /// Path to the `op` executable. Defaults to `op` on `PATH`.
    #[serde(default = "default_op_path")]
    pub op_path: String,

    /// Service account token; the signed-in account is used when unset.
    #[serde(default)]
    pub service_account_token: Option<String>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnePasswordConnectSettings {
    /// Base URL of the Connect server, e.g. `http://localhost:8080`.
    pub server_url: String,

    /// Connect API token.
    pub token: String,

    /// Vault searched for plain `{{secret:name}}` references.
    #[serde(default)]
    pub default_vault_id: Option<String>,

    /// Request timeout in seconds. Defaults to 10.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_connect_timeout_secs")]
    pub timeout_secs: u64,
}

// The token must never show up in logs.
impl std::fmt::Debug for OnePasswordConnectSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnePasswordConnectSettings")
            .field("server_url", &self.server_url)
            .field("token", &"<redacted>")
            .field("default_vault_id", &self.default_vault_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for HttprexConfig {
    fn default() -> Self {
        Self {
            environment_file: None,
            default_environment: None,
            auto_select_environment: default_auto_select_environment(),
            secret_cache: default_secret_cache(),
            secrets: SecretsConfig::default(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            process_env: default_process_env(),
            process_env_prefix: default_process_env_prefix(),
            prompt: false,
            one_password_cli: None,
            one_password_connect: None,
        }
    }
}

impl Default for OnePasswordCliSettings {
    fn default() -> Self {
        Self {
            op_path: default_op_path(),
            service_account_token: None,
        }
    }
}

impl HttprexConfig {
    /// Validates the configuration and returns errors if any settings are invalid.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all settings are valid, or `Err` with a descriptive error message.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(file) = &self.environment_file {
            if file.trim().is_empty() {
                return Err("environmentFile must not be empty".to_string());
            }
        }

        if let Some(name) = &self.default_environment {
            if name.trim().is_empty() {
                return Err("defaultEnvironment must not be empty".to_string());
            }
        }

        if let Some(cli) = &self.secrets.one_password_cli {
            if cli.op_path.trim().is_empty() {
                return Err("secrets.onePasswordCli.opPath must not be empty".to_string());
            }
        }

        if let Some(connect) = &self.secrets.one_password_connect {
            match url::Url::parse(&connect.server_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => {
                    return Err(format!(
                        "secrets.onePasswordConnect.serverUrl must be an http(s) URL, got '{}'",
                        connect.server_url
                    ))
                }
            }
            if connect.token.trim().is_empty() {
                return Err("secrets.onePasswordConnect.token must not be empty".to_string());
            }
            if connect.timeout_secs == 0 {
                return Err("secrets.onePasswordConnect.timeoutSecs must be greater than 0".to_string());
            }
        }

        Ok(())
    }

    /// Merges this configuration with another, using values from `other` where present.
    ///
    /// Optional settings missing from `other` keep the value from `self`.
    pub fn merge(&self, other: &HttprexConfig) -> Self {
        Self {
            environment_file: other
                .environment_file
                .clone()
                .or_else(|| self.environment_file.clone()),
            default_environment: other
                .default_environment
                .clone()
                .or_else(|| self.default_environment.clone()),
            auto_select_environment: other.auto_select_environment,
            secret_cache: other.secret_cache,
            secrets: SecretsConfig {
                process_env: other.secrets.process_env,
                process_env_prefix: other.secrets.process_env_prefix.clone(),
                prompt: other.secrets.prompt,
                one_password_cli: other
                    .secrets
                    .one_password_cli
                    .clone()
                    .or_else(|| self.secrets.one_password_cli.clone()),
                one_password_connect: other
                    .secrets
                    .one_password_connect
                    .clone()
                    .or_else(|| self.secrets.one_password_connect.clone()),
            },
        }
    }
}

// Default value functions for serde

fn default_auto_select_environment() -> bool {
    false
}

fn default_secret_cache() -> bool {
    true
}

fn default_process_env() -> bool {
    true
}

fn default_process_env_prefix() -> String {
    "HTTPREX_".to_string()
}

fn default_op_path() -> String {
    "op".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}
