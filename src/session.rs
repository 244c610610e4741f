//! Session: the composition point.
//!
//! A [`Session`] owns one environment manager, one secret manager and one
//! global variable storage, built from an [`HttprexConfig`]. Library code
//! never reaches for shared instances; everything flows from the session the
//! caller creates.

use crate::config::{ConfigError, HttprexConfig};
use crate::environment::{EnvError, EnvironmentManager, EnvironmentManagerOptions};
use crate::models::ParsedRequestFile;
use crate::parser::{self, ParseResult};
use crate::secrets::{
    EnvSecretProvider, OnePasswordCliConfig, OnePasswordCliProvider, PromptSecretProvider,
    SecretError, SecretManager,
};
use crate::variables::{InMemoryVariableStorage, VariableContext, VariableResolver, VariableStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Provider priorities; higher is asked first.
pub const ONE_PASSWORD_CONNECT_PRIORITY: i32 = 40;
pub const ONE_PASSWORD_CLI_PRIORITY: i32 = 30;
pub const PROCESS_ENV_PRIORITY: i32 = 20;
pub const PROMPT_PRIORITY: i32 = 10;

/// Errors raised while building a session.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Environment(EnvError),
    Secret(SecretError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Config(e) => write!(f, "{}", e),
            SessionError::Environment(e) => write!(f, "{}", e),
            SessionError::Secret(e) => write!(f, "Failed to set up secret provider: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Config(e) => Some(e),
            SessionError::Environment(e) => Some(e),
            SessionError::Secret(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}

impl From<EnvError> for SessionError {
    fn from(err: EnvError) -> Self {
        SessionError::Environment(err)
    }
}

impl From<SecretError> for SessionError {
    fn from(err: SecretError) -> Self {
        SessionError::Secret(err)
    }
}

/// Everything needed to resolve request documents.
///
/// Cloning gives another handle to the same managers and storage.
#[derive(Clone)]
pub struct Session {
    config: HttprexConfig,
    environments: EnvironmentManager,
    secrets: Arc<SecretManager>,
    storage: Arc<dyn VariableStorage>,
    environment_file: Option<PathBuf>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("environments", &self.environments.list_environments())
            .field("current_environment", &self.environments.current_environment_name())
            .field("secret_providers", &self.secrets.list_providers())
            .field("environment_file", &self.environment_file)
            .finish()
    }
}

impl Session {
    /// Builds a session from `config`.
    ///
    /// An explicit `environmentFile` is resolved against `workspace` and must
    /// exist; otherwise `workspace` is searched for an environment file. The
    /// configured default environment must be one of the loaded ones.
    pub fn from_config(config: HttprexConfig, workspace: Option<&Path>) -> Result<Self, SessionError> {
        config.validate().map_err(ConfigError::Invalid)?;

        let environments = EnvironmentManager::with_options(EnvironmentManagerOptions {
            auto_select: config.auto_select_environment,
            on_environment_change: None,
        });

        let environment_file = match (&config.environment_file, workspace) {
            (Some(file), workspace) => {
                let path = match workspace {
                    Some(root) if Path::new(file).is_relative() => root.join(file),
                    _ => PathBuf::from(file),
                };
                environments.load_from_file(&path)?;
                Some(path)
            }
            (None, Some(root)) => environments.load_from_workspace(root)?,
            (None, None) => None,
        };

        if let Some(name) = &config.default_environment {
            environments.set_current_environment(Some(name))?;
        }

        let secrets = Arc::new(SecretManager::new());
        secrets.set_cache_enabled(config.secret_cache);
        register_providers(&secrets, &config)?;

        log::info!(
            "Session ready: {} environment(s), providers {:?}",
            environments.list_environments().len(),
            secrets.list_providers()
        );

        Ok(Self {
            config,
            environments,
            secrets,
            storage: Arc::new(InMemoryVariableStorage::new()),
            environment_file,
        })
    }

    /// Replaces the global variable storage.
    pub fn with_storage(mut self, storage: Arc<dyn VariableStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn config(&self) -> &HttprexConfig {
        &self.config
    }

    pub fn environments(&self) -> &EnvironmentManager {
        &self.environments
    }

    pub fn secrets(&self) -> &Arc<SecretManager> {
        &self.secrets
    }

    pub fn storage(&self) -> &Arc<dyn VariableStorage> {
        &self.storage
    }

    /// The environment file loaded, if any.
    pub fn environment_file(&self) -> Option<&Path> {
        self.environment_file.as_deref()
    }

    /// Selects an environment, or clears the selection with `None`.
    pub fn set_environment(&self, name: Option<&str>) -> Result<(), EnvError> {
        self.environments.set_current_environment(name)
    }

    /// A resolver wired to this session for the requests of `file`.
    ///
    /// Global variables are not loaded yet; call
    /// [`VariableResolver::load_global_variables`] before resolving if they
    /// should take part.
    pub fn resolver_for(&self, file: &ParsedRequestFile) -> VariableResolver {
        VariableResolver::new(VariableContext::with_file_variables(file.file_variables.clone()))
            .with_environment_manager(self.environments.clone())
            .with_secret_manager(self.secrets.clone())
            .with_storage(self.storage.clone())
    }

    /// Parses a document and resolves every request in it, secrets included.
    ///
    /// Parse errors are carried over unchanged; resolution itself never
    /// fails, leaving unknown placeholders as written.
    pub async fn resolve_document(&self, text: &str) -> ParseResult<ParsedRequestFile> {
        let mut result = parser::parse_file(text);

        if let Some(file) = result.data.as_mut() {
            let mut resolver = self.resolver_for(file);
            resolver.load_global_variables().await;

            let mut resolved = Vec::with_capacity(file.requests.len());
            for request in &file.requests {
                resolved.push(resolver.resolve_request_async(request).await);
            }
            file.requests = resolved;
        }

        result
    }
}

fn register_providers(secrets: &SecretManager, config: &HttprexConfig) -> Result<(), SessionError> {
    let settings = &config.secrets;

    if let Some(connect) = &settings.one_password_connect {
        register_connect(secrets, connect)?;
    }

    if let Some(cli) = &settings.one_password_cli {
        secrets.register_provider(
            Arc::new(OnePasswordCliProvider::new(OnePasswordCliConfig {
                op_path: cli.op_path.clone(),
                service_account_token: cli.service_account_token.clone(),
            })),
            ONE_PASSWORD_CLI_PRIORITY,
        );
    }

    if settings.process_env {
        secrets.register_provider(
            Arc::new(EnvSecretProvider::with_prefix(settings.process_env_prefix.clone())),
            PROCESS_ENV_PRIORITY,
        );
    }

    if settings.prompt {
        secrets.register_provider(Arc::new(PromptSecretProvider::terminal()), PROMPT_PRIORITY);
    }

    Ok(())
}

#[cfg(feature = "connect")]
fn register_connect(
    secrets: &SecretManager,
    settings: &crate::config::OnePasswordConnectSettings,
) -> Result<(), SessionError> {
    use crate::secrets::{OnePasswordConnectConfig, OnePasswordConnectProvider};

    let provider = OnePasswordConnectProvider::new(OnePasswordConnectConfig {
        server_url: settings.server_url.clone(),
        token: settings.token.clone(),
        default_vault_id: settings.default_vault_id.clone(),
        timeout_secs: settings.timeout_secs,
    })?;
    secrets.register_provider(Arc::new(provider), ONE_PASSWORD_CONNECT_PRIORITY);
    Ok(())
}

#[cfg(not(feature = "connect"))]
fn register_connect(
    _secrets: &SecretManager,
    settings: &crate::config::OnePasswordConnectSettings,
) -> Result<(), SessionError> {
    log::warn!(
        "1Password Connect is configured for {} but httprex was built without the `connect` feature",
        settings.server_url
    );
    Ok(())
}
