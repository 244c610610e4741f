//! Variable resolver.
//!
//! Replaces `{{name}}` placeholders in a parsed request. For each name the
//! first match wins:
//!
//! 1. a secret found by the [`SecretManager`] (async path only)
//! 2. a recognized system variable (`$guid`, `$datetime`, ...)
//! 3. the flattened variable map
//!
//! Anything else is left untouched. The flattened map is built in ascending
//! precedence from the environment manager, the `from_environment`,
//! `from_file` context, global storage and the `from_system` context.

use super::storage::VariableStorage;
use super::system::{is_system_variable, resolve_system_variable};
use crate::environment::EnvironmentManager;
use crate::models::{ParsedRequest, RequestBody, VariableMap};
use crate::parser::lexer::VARIABLE_REGEX;
use crate::secrets::{SecretManager, SecretReference};
use regex::Captures;
use serde_json::Value;
use std::sync::Arc;

/// Caller-supplied variable sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableContext {
    /// Environment variables supplied directly, on top of the environment manager
    pub from_environment: VariableMap,

    /// `@name = value` assignments of the document
    pub from_file: VariableMap,

    /// Host-provided overrides with the highest map precedence
    pub from_system: VariableMap,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_variables(file_variables: VariableMap) -> Self {
        Self {
            from_file: file_variables,
            ..Self::default()
        }
    }
}

/// Resolves placeholders against every configured variable source.
///
/// Resolution never mutates the input request; a resolved copy is returned.
#[derive(Clone, Default)]
pub struct VariableResolver {
    context: VariableContext,
    global_variables: VariableMap,
    environment: Option<EnvironmentManager>,
    secrets: Option<Arc<SecretManager>>,
    storage: Option<Arc<dyn VariableStorage>>,
}

impl std::fmt::Debug for VariableResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableResolver")
            .field("context", &self.context)
            .field("global_variables", &self.global_variables.len())
            .field("environment", &self.environment.is_some())
            .field("secrets", &self.secrets.is_some())
            .field("storage", &self.storage.is_some())
            .finish()
    }
}

impl VariableResolver {
    pub fn new(context: VariableContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// Reads the selected environment's variables from `manager` on every
    /// resolution.
    pub fn with_environment_manager(mut self, manager: EnvironmentManager) -> Self {
        self.environment = Some(manager);
        self
    }

    /// Enables secret lookups on the async path.
    pub fn with_secret_manager(mut self, manager: Arc<SecretManager>) -> Self {
        self.secrets = Some(manager);
        self
    }

    /// Source for [`load_global_variables`](Self::load_global_variables).
    pub fn with_storage(mut self, storage: Arc<dyn VariableStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn context(&self) -> &VariableContext {
        &self.context
    }

    /// Replaces the whole context.
    pub fn set_context(&mut self, context: VariableContext) {
        self.context = context;
    }

    /// Modifies the context in place.
    ///
    /// ```
    /// use httprex::variables::{VariableContext, VariableResolver};
    ///
    /// let mut resolver = VariableResolver::new(VariableContext::new());
    /// resolver.update_context(|ctx| {
    ///     ctx.from_file.insert("host".to_string(), "example.com".to_string());
    /// });
    /// assert_eq!(resolver.resolve_string("https://{{host}}/"), "https://example.com/");
    /// ```
    pub fn update_context<F>(&mut self, update: F)
    where
        F: FnOnce(&mut VariableContext),
    {
        update(&mut self.context);
    }

    /// Snapshot of global variables taken by the last load.
    pub fn global_variables(&self) -> &VariableMap {
        &self.global_variables
    }

    /// Refreshes the global variable snapshot from storage.
    ///
    /// A failing backend is logged and treated as empty.
    pub async fn load_global_variables(&mut self) {
        let Some(storage) = &self.storage else {
            return;
        };
        self.global_variables = match storage.get_all().await {
            Ok(variables) => variables,
            Err(e) => {
                log::warn!("Failed to load global variables: {}", e);
                VariableMap::new()
            }
        };
    }

    /// Builds the flattened variable map.
    pub fn variable_map(&self) -> VariableMap {
        let mut map = self
            .environment
            .as_ref()
            .map(EnvironmentManager::environment_variables)
            .unwrap_or_default();

        for source in [
            &self.context.from_environment,
            &self.context.from_file,
            &self.global_variables,
            &self.context.from_system,
        ] {
            map.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        map
    }

    /// Resolves a request without consulting secret providers.
    pub fn resolve_request(&self, request: &ParsedRequest) -> ParsedRequest {
        let variables = self.variable_map();
        substitute_request(request, |text| {
            substitute(text, &variables, &VariableMap::new())
        })
    }

    /// Resolves a request, looking up secret references first.
    ///
    /// Secrets are fetched one at a time in placeholder order.
    pub async fn resolve_request_async(&self, request: &ParsedRequest) -> ParsedRequest {
        let secrets = self.lookup_secrets(&placeholder_names(request)).await;
        let variables = self.variable_map();
        substitute_request(request, |text| substitute(text, &variables, &secrets))
    }

    /// Resolves free text without consulting secret providers.
    pub fn resolve_string(&self, text: &str) -> String {
        substitute(text, &self.variable_map(), &VariableMap::new())
    }

    /// Resolves free text, secrets included.
    pub async fn resolve_string_async(&self, text: &str) -> String {
        let names = collect_names(std::iter::once(text));
        let secrets = self.lookup_secrets(&names).await;
        substitute(text, &self.variable_map(), &secrets)
    }

    /// Names the synchronous path would leave untouched.
    ///
    /// Secret references are not reported; use
    /// [`get_unresolved_variables_async`](Self::get_unresolved_variables_async)
    /// to check them against the providers.
    pub fn get_unresolved_variables(&self, request: &ParsedRequest) -> Vec<String> {
        let variables = self.variable_map();
        placeholder_names(request)
            .into_iter()
            .filter(|name| {
                SecretReference::parse(name).is_none() && lookup(name, &variables).is_none()
            })
            .collect()
    }

    /// Names the async path would leave untouched, including secret
    /// references no provider can resolve.
    pub async fn get_unresolved_variables_async(&self, request: &ParsedRequest) -> Vec<String> {
        let names = placeholder_names(request);
        let secrets = self.lookup_secrets(&names).await;
        let variables = self.variable_map();
        names
            .into_iter()
            .filter(|name| !secrets.contains_key(name) && lookup(name, &variables).is_none())
            .collect()
    }

    async fn lookup_secrets(&self, names: &[String]) -> VariableMap {
        let mut found = VariableMap::new();
        let Some(manager) = &self.secrets else {
            return found;
        };

        for name in names {
            let Some(reference) = SecretReference::parse(name) else {
                continue;
            };
            let result = manager.get_secret(&reference).await;
            match result.value {
                Some(value) if result.found => {
                    found.insert(name.clone(), value);
                }
                _ => log::debug!(
                    "Secret {} left unresolved: {}",
                    reference,
                    result.error.as_deref().unwrap_or("not found")
                ),
            }
        }

        found
    }
}

/// Value for a non-secret name: system variables first, then the map.
fn lookup(name: &str, variables: &VariableMap) -> Option<String> {
    if is_system_variable(name) {
        if let Some(value) = resolve_system_variable(name) {
            return Some(value);
        }
    }
    variables.get(name).cloned()
}

fn substitute(text: &str, variables: &VariableMap, secrets: &VariableMap) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }

    VARIABLE_REGEX
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].trim();
            secrets
                .get(name)
                .cloned()
                .or_else(|| lookup(name, variables))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Applies `resolve` to the URL, every header value and every body string.
fn substitute_request<F>(request: &ParsedRequest, resolve: F) -> ParsedRequest
where
    F: Fn(&str) -> String,
{
    let mut resolved = request.clone();
    resolved.url = resolve(&request.url);
    resolved.headers = request
        .headers
        .iter()
        .map(|(name, value)| (name.clone(), resolve(value)))
        .collect();
    resolved.body = match &request.body {
        RequestBody::Absent => RequestBody::Absent,
        RequestBody::Text(text) => RequestBody::Text(resolve(text)),
        RequestBody::Structured(value) => RequestBody::Structured(substitute_json(value, &resolve)),
    };
    resolved
}

/// Substitutes string values at any depth; object keys are kept as written.
fn substitute_json<F>(value: &Value, resolve: &F) -> Value
where
    F: Fn(&str) -> String,
{
    match value {
        Value::String(s) => Value::String(resolve(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_json(v, resolve)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_json(v, resolve)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn collect_json_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_json_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_json_strings(v, out)),
        _ => {}
    }
}

/// Unique placeholder names in URL, header and body order.
fn placeholder_names(request: &ParsedRequest) -> Vec<String> {
    let mut texts: Vec<&str> = vec![request.url.as_str()];
    texts.extend(request.headers.values().map(String::as_str));
    match &request.body {
        RequestBody::Absent => {}
        RequestBody::Text(text) => texts.push(text),
        RequestBody::Structured(value) => collect_json_strings(value, &mut texts),
    }
    collect_names(texts)
}

fn collect_names<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut names: Vec<String> = Vec::new();
    for text in texts {
        for caps in VARIABLE_REGEX.captures_iter(text) {
            let name = caps[1].trim();
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}
