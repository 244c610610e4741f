//! Variable resolution for parsed requests.
//!
//! This module substitutes `{{name}}` placeholders using environment, file,
//! global and host-supplied variables, generated system variables, and
//! secrets from the secret manager.

pub mod resolver;
pub mod storage;
pub mod system;

pub use resolver::{VariableContext, VariableResolver};
pub use storage::{InMemoryVariableStorage, StorageError, VariableStorage};
pub use system::{is_system_variable, resolve_system_variable, DatetimeFormat, SystemVariable};
