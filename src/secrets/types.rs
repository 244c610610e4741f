//! Secret references, provider results and the provider trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which placeholder syntax a secret reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    /// `{{secret:name}}`
    Secret,
    /// `{{vault:name}}`, kept distinct for compatibility with other tools
    Vault,
    /// `{{op://vault/item/field}}`
    OnePassword,
}

impl SecretKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::Secret => "secret",
            SecretKind::Vault => "vault",
            SecretKind::OnePassword => "onepassword",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placeholder name recognized as a secret lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretReference {
    #[serde(rename = "type")]
    pub kind: SecretKind,
    /// Name after the prefix; the whole `op://...` string for 1Password
    pub name: String,
    /// `vault/item/field` for 1Password references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl SecretReference {
    pub fn new(kind: SecretKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            path: None,
        }
    }

    /// Parses a placeholder name into a secret reference.
    ///
    /// Returns `None` for anything that is not `secret:`, `vault:` or `op://`.
    ///
    /// # Examples
    ///
    /// ```
    /// use httprex::secrets::{SecretKind, SecretReference};
    ///
    /// let reference = SecretReference::parse("op://Private/GitHub/token").unwrap();
    /// assert_eq!(reference.kind, SecretKind::OnePassword);
    /// assert_eq!(reference.path.as_deref(), Some("Private/GitHub/token"));
    ///
    /// assert!(SecretReference::parse("baseUrl").is_none());
    /// ```
    pub fn parse(var_name: &str) -> Option<Self> {
        if let Some(name) = var_name.strip_prefix("secret:") {
            return Some(Self::new(SecretKind::Secret, name));
        }
        if let Some(name) = var_name.strip_prefix("vault:") {
            return Some(Self::new(SecretKind::Vault, name));
        }
        if let Some(path) = var_name.strip_prefix("op://") {
            return Some(Self {
                kind: SecretKind::OnePassword,
                name: var_name.to_string(),
                path: Some(path.to_string()),
            });
        }
        None
    }

    /// Cache key of the form `type:name`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }

    /// Name shown to users: the path for 1Password references.
    pub fn display_name(&self) -> &str {
        match (&self.kind, &self.path) {
            (SecretKind::OnePassword, Some(path)) => path,
            _ => &self.name,
        }
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SecretKind::OnePassword => f.write_str(&self.name),
            kind => write!(f, "{}:{}", kind, self.name),
        }
    }
}

/// Outcome of a secret lookup.
///
/// `found` is authoritative: an empty `value` with `found == true` is a real,
/// empty secret.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretProviderResult {
    pub value: Option<String>,
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Name of the provider that resolved the secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl SecretProviderResult {
    pub fn found(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            found: true,
            error: None,
            provider: None,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn not_found_with(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

// Secret values must never end up in logs.
impl fmt::Debug for SecretProviderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretProviderResult")
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .field("found", &self.found)
            .field("error", &self.error)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Errors raised by secret providers.
///
/// The manager never propagates these: a failing provider is logged and
/// treated as "not found by this provider".
#[derive(Debug)]
pub enum SecretError {
    /// Provider backend cannot be reached or used.
    Unavailable(String),

    /// Provider-specific failure.
    Provider { provider: String, message: String },

    /// The provider does not support the operation.
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    /// Spawning or talking to an external process failed.
    Io(std::io::Error),

    /// HTTP transport failure.
    Http(String),

    /// A backend answered with something that could not be decoded.
    InvalidResponse(String),
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretError::Unavailable(msg) => write!(f, "Secret provider unavailable: {}", msg),
            SecretError::Provider { provider, message } => {
                write!(f, "Secret provider '{}' failed: {}", provider, message)
            }
            SecretError::Unsupported {
                provider,
                operation,
            } => write!(
                f,
                "Secret provider '{}' does not support {}",
                provider, operation
            ),
            SecretError::Io(err) => write!(f, "I/O error: {}", err),
            SecretError::Http(msg) => write!(f, "HTTP error: {}", msg),
            SecretError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for SecretError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SecretError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SecretError {
    fn from(err: std::io::Error) -> Self {
        SecretError::Io(err)
    }
}

impl From<serde_json::Error> for SecretError {
    fn from(err: serde_json::Error) -> Self {
        SecretError::InvalidResponse(err.to_string())
    }
}

#[cfg(feature = "connect")]
impl From<reqwest::Error> for SecretError {
    fn from(err: reqwest::Error) -> Self {
        SecretError::Http(err.to_string())
    }
}

/// A pluggable secret backend.
///
/// Implementations must be `Send + Sync`; the manager shares them behind
/// `Arc` and awaits them one at a time.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Unique identifier, used for registration and result stamping.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Whether the backend can be used right now.
    async fn is_available(&self) -> Result<bool, SecretError>;

    /// Looks a secret up. "Not found" is a successful `Ok` result.
    async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretProviderResult, SecretError>;

    /// Names of the secrets the backend knows about, for completion.
    async fn list_secrets(&self) -> Result<Vec<String>, SecretError> {
        Ok(Vec::new())
    }

    /// Whether `set_secret`/`delete_secret` are supported.
    fn is_writable(&self) -> bool {
        false
    }

    async fn set_secret(&self, _name: &str, _value: &str) -> Result<(), SecretError> {
        Err(SecretError::Unsupported {
            provider: self.name().to_string(),
            operation: "set_secret",
        })
    }

    async fn delete_secret(&self, _name: &str) -> Result<(), SecretError> {
        Err(SecretError::Unsupported {
            provider: self.name().to_string(),
            operation: "delete_secret",
        })
    }
}
