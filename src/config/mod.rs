//! Configuration management.
//!
//! Configuration is read from a settings document under the `"httprex"` key
//! and merged with defaults. There is no global configuration: the loaded
//! value is handed to [`Session::from_config`](crate::session::Session::from_config).

pub mod schema;

pub use schema::{HttprexConfig, OnePasswordCliSettings, OnePasswordConnectSettings, SecretsConfig};

use serde_json::Value;
use std::fs;
use std::path::Path;

/// Key holding httprex settings in a settings document.
pub const SETTINGS_KEY: &str = "httprex";

/// Errors raised while loading configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Settings were read but failed validation
    Invalid(String),

    /// A configuration file is not valid JSON or has the wrong shape
    Parse(String),

    /// IO error occurred while reading a configuration file
    Io(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Failed to parse configuration: {}", msg),
            ConfigError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Loads configuration from a settings document.
///
/// Reads the `"httprex"` settings, merges them with defaults and validates
/// the result. Settings that cannot be deserialized are logged and replaced
/// by defaults.
///
/// # Example
///
/// ```
/// use httprex::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "httprex": {
///         "defaultEnvironment": "local",
///         "secretCache": false
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.default_environment.as_deref(), Some("local"));
/// assert!(!config.secret_cache);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<HttprexConfig, ConfigError> {
    let mut config = HttprexConfig::default();

    if let Some(settings) = settings_json {
        if let Some(httprex_settings) = settings.get(SETTINGS_KEY) {
            match serde_json::from_value::<HttprexConfig>(httprex_settings.clone()) {
                Ok(user_config) => {
                    config = config.merge(&user_config);
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse {} settings: {}. Using defaults.",
                        SETTINGS_KEY,
                        e
                    );
                }
            }
        }
    }

    config.validate().map_err(ConfigError::Invalid)?;

    Ok(config)
}

/// Loads configuration from a JSON file.
///
/// The file may hold either a settings document with an `"httprex"` key or
/// the configuration object itself. Unlike [`load_config`], malformed
/// settings in an explicitly named file are an error.
pub fn load_config_file(path: &Path) -> Result<HttprexConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    let settings = document.get(SETTINGS_KEY).cloned().unwrap_or(document);

    let user_config: HttprexConfig = serde_json::from_value(settings)?;
    let config = HttprexConfig::default().merge(&user_config);
    config.validate().map_err(ConfigError::Invalid)?;

    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}
