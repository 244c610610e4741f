//! httprex: parser and variable resolver for `.http` request documents
//!
//! This crate turns human-authored request documents into structured
//! requests and resolves their `{{placeholders}}` from environments, file
//! variables, global storage, generated system values and secret providers.
//! Sending requests is left to the caller.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **models**: Core data structures for parsed requests
//! - **parser**: Parses request documents into [`ParsedRequest`] values,
//!   accumulating errors instead of stopping at the first one
//! - **environment**: Environment documents (`$shared` plus named
//!   environments) and the current selection
//! - **secrets**: Secret manager and pluggable providers (memory, process
//!   environment, terminal prompt, 1Password CLI, 1Password Connect)
//! - **variables**: System variables, global storage and the resolver
//! - **config**: User configuration
//! - **session**: Wires the managers together from a configuration
//!
//! # Document format
//!
//! ```http
//! @baseUrl = https://api.example.com
//!
//! ###
//! # @name listUsers
//! GET {{baseUrl}}/users
//! Authorization: Bearer {{secret:api-token}}
//!
//! ###
//!
//! POST {{baseUrl}}/users
//! Content-Type: application/json
//!
//! {"name": "John", "id": "{{$guid}}"}
//! ```
//!
//! # Example
//!
//! ```
//! use httprex::parser::parse_file;
//! use httprex::variables::{VariableContext, VariableResolver};
//!
//! let text = "@host = example.com\n\n###\nGET https://{{host}}/users\nAccept: application/json\n";
//! let file = parse_file(text).data.unwrap();
//!
//! let resolver = VariableResolver::new(VariableContext::with_file_variables(
//!     file.file_variables.clone(),
//! ));
//! let request = resolver.resolve_request(&file.requests[0]);
//! assert_eq!(request.url, "https://example.com/users");
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

pub mod config;
pub mod environment;
pub mod models;
pub mod parser;
pub mod secrets;
pub mod session;
pub mod variables;

pub use config::{load_config, HttprexConfig};
pub use environment::EnvironmentManager;
pub use models::{HttpMethod, ParsedRequest, ParsedRequestFile, RequestBody, VariableMap};
pub use parser::{parse_file, parse_request, ParseResult};
pub use secrets::{SecretManager, SecretProvider, SecretReference};
pub use session::{Session, SessionError};
pub use variables::{VariableContext, VariableResolver};
