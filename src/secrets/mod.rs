//! Secret resolution for `{{secret:name}}`, `{{vault:name}}` and
//! `{{op://vault/item/field}}` placeholders.
//!
//! A [`SecretManager`] asks pluggable [`SecretProvider`] backends in priority
//! order and caches the first hit. Provider failures never abort a
//! resolution; they show up as `found == false` with an error message.
//!
//! # Example
//!
//! ```
//! use httprex::secrets::{MemorySecretProvider, SecretManager, SecretReference};
//! use std::sync::Arc;
//!
//! # let runtime = tokio::runtime::Runtime::new().unwrap();
//! # runtime.block_on(async {
//! let manager = SecretManager::new();
//! manager.register_provider(
//!     Arc::new(MemorySecretProvider::with_secrets([("api-token", "secret123")])),
//!     0,
//! );
//!
//! let reference = SecretReference::parse("secret:api-token").unwrap();
//! let result = manager.get_secret(&reference).await;
//! assert_eq!(result.value.as_deref(), Some("secret123"));
//! assert_eq!(result.provider.as_deref(), Some("memory"));
//! # });
//! ```

pub mod manager;
pub mod providers;
pub mod types;

pub use manager::{SecretManager, DEFAULT_PRIORITY};
pub use providers::{
    EnvSecretProvider, MemorySecretProvider, OnePasswordCliConfig, OnePasswordCliProvider,
    PromptSecretProvider,
};
#[cfg(feature = "connect")]
pub use providers::{OnePasswordConnectConfig, OnePasswordConnectProvider};
pub use types::{SecretError, SecretKind, SecretProvider, SecretProviderResult, SecretReference};
