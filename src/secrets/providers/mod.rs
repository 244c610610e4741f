//! Built-in secret providers.

pub mod env;
pub mod memory;
pub mod onepassword_cli;
#[cfg(feature = "connect")]
pub mod onepassword_connect;
pub mod prompt;

pub use env::EnvSecretProvider;
pub use memory::MemorySecretProvider;
pub use onepassword_cli::{OnePasswordCliConfig, OnePasswordCliProvider};
#[cfg(feature = "connect")]
pub use onepassword_connect::{OnePasswordConnectConfig, OnePasswordConnectProvider};
pub use prompt::{PromptFn, PromptSecretProvider};
