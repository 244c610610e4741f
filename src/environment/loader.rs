//! Environment document loading.
//!
//! Documents come from a JSON string, an already parsed `serde_json::Value`,
//! or a file found by searching a workspace directory and up to 3 of its
//! parents for `.http-client-env.json` or `http-client.env.json`.

use super::models::{Environment, Environments, SHARED_KEY};
use crate::models::VariableMap;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors raised while loading or selecting environments.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvError {
    /// No environment file at the given path
    FileNotFound(PathBuf),

    /// The document is not valid JSON
    Parse(String),

    /// Valid JSON with the wrong shape
    InvalidFormat(String),

    /// IO error occurred while reading the file
    Io(String),

    /// Selection of an environment that was never loaded
    UnknownEnvironment(String),
}

impl std::fmt::Display for EnvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvError::FileNotFound(path) => {
                write!(f, "Environment file not found: {}", path.display())
            }
            EnvError::Parse(msg) => write!(f, "Invalid http-client.env.json format: {}", msg),
            EnvError::InvalidFormat(msg) => write!(f, "Invalid environment format: {}", msg),
            EnvError::Io(msg) => write!(f, "IO error: {}", msg),
            EnvError::UnknownEnvironment(name) => write!(f, "Environment \"{}\" not found", name),
        }
    }
}

impl std::error::Error for EnvError {}

impl From<io::Error> for EnvError {
    fn from(err: io::Error) -> Self {
        EnvError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(err: serde_json::Error) -> Self {
        EnvError::Parse(err.to_string())
    }
}

/// Supported environment file names in order of preference
pub const ENV_FILE_NAMES: &[&str] = &[".http-client-env.json", "http-client.env.json"];

/// Maximum number of parent directories to search
const MAX_PARENT_SEARCH_DEPTH: usize = 3;

/// Finds the environment file for `workspace_path`.
///
/// The workspace directory is checked first, then up to 3 parents.
pub fn find_environment_file(workspace_path: &Path) -> Option<PathBuf> {
    let mut current_path = workspace_path.to_path_buf();

    for _ in 0..=MAX_PARENT_SEARCH_DEPTH {
        for filename in ENV_FILE_NAMES {
            let candidate = current_path.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        match current_path.parent() {
            Some(parent) => current_path = parent.to_path_buf(),
            None => break,
        }
    }

    None
}

/// Reads and parses the environment file at `path`.
pub fn load_environment_file(path: &Path) -> Result<Environments, EnvError> {
    if !path.is_file() {
        return Err(EnvError::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    parse_environments_str(&content)
}

/// Parses an environment document from JSON text.
pub fn parse_environments_str(content: &str) -> Result<Environments, EnvError> {
    let raw: Value = serde_json::from_str(content)?;
    parse_environments(&raw)
}

/// Builds environments from a parsed document.
///
/// Every top-level key except `$shared` is an environment; `null` entries
/// are skipped. Scalars are stringified, `null` variables become `""`, and
/// nested objects or arrays are rejected.
pub fn parse_environments(raw: &Value) -> Result<Environments, EnvError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| EnvError::InvalidFormat("Root must be a JSON object".to_string()))?;

    let shared = match obj.get(SHARED_KEY) {
        Some(Value::Null) | None => VariableMap::new(),
        Some(value) => parse_variable_map(value, SHARED_KEY)?,
    };

    let mut environments = Environments {
        shared,
        ..Environments::default()
    };

    for (name, value) in obj.iter() {
        if name == SHARED_KEY || value.is_null() {
            continue;
        }
        let own = parse_variable_map(value, name)?;
        environments.add_environment(Environment::merged(name.as_str(), &environments.shared, own));
    }

    Ok(environments)
}

/// Converts a JSON object into a string-valued variable map.
fn parse_variable_map(value: &Value, context: &str) -> Result<VariableMap, EnvError> {
    let obj = value
        .as_object()
        .ok_or_else(|| EnvError::InvalidFormat(format!("'{}' must be a JSON object", context)))?;

    let mut map = VariableMap::new();

    for (key, val) in obj.iter() {
        let value_str = match val {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            _ => {
                return Err(EnvError::InvalidFormat(format!(
                    "Variable '{}' in '{}' has invalid type (must be string, number, or boolean)",
                    key, context
                )));
            }
        };

        map.insert(key.clone(), value_str);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_env_file(dir: &Path, filename: &str, content: &str) -> PathBuf {
        let path = dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_simple() {
        let envs = parse_environments_str(
            r#"{
                "dev": {"baseUrl": "http://localhost:3000", "apiKey": "dev-key-123"},
                "prod": {"baseUrl": "https://api.example.com", "apiKey": "prod-key-456"}
            }"#,
        )
        .unwrap();

        assert_eq!(envs.list_environments(), vec!["dev", "prod"]);
        let dev = envs.get_environment("dev").unwrap();
        assert_eq!(dev.get("baseUrl").unwrap(), "http://localhost:3000");
        assert_eq!(dev.get("apiKey").unwrap(), "dev-key-123");
    }

    #[test]
    fn test_parse_with_shared() {
        let envs = parse_environments_str(
            r#"{
                "$shared": {"contentType": "application/json", "version": "v1"},
                "dev": {"baseUrl": "http://localhost:3000", "version": "v2"}
            }"#,
        )
        .unwrap();

        assert_eq!(envs.len(), 1);
        assert_eq!(envs.shared.len(), 2);

        let dev = envs.get_environment("dev").unwrap();
        assert_eq!(dev.get("contentType").unwrap(), "application/json");
        assert_eq!(dev.get("version").unwrap(), "v2");
        assert_eq!(dev.shared_variables, vec!["contentType"]);
    }

    #[test]
    fn test_parse_variable_types() {
        let envs = parse_environments_str(
            r#"{"dev": {"stringVar": "hello", "numberVar": 42, "boolVar": true, "nullVar": null}}"#,
        )
        .unwrap();
        let dev = envs.get_environment("dev").unwrap();

        assert_eq!(dev.get("stringVar").unwrap(), "hello");
        assert_eq!(dev.get("numberVar").unwrap(), "42");
        assert_eq!(dev.get("boolVar").unwrap(), "true");
        assert_eq!(dev.get("nullVar").unwrap(), "");
    }

    #[test]
    fn test_nested_values_are_rejected() {
        let result = parse_environments_str(r#"{"dev": {"nested": {"a": 1}}}"#);
        assert!(matches!(result, Err(EnvError::InvalidFormat(_))));

        let result = parse_environments_str(r#"{"dev": "not an object"}"#);
        assert!(matches!(result, Err(EnvError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_environments_str("{ invalid json }");
        let err = result.unwrap_err();
        assert!(matches!(err, EnvError::Parse(_)));
        assert!(err.to_string().starts_with("Invalid http-client.env.json format"));
    }

    #[test]
    fn test_parse_invalid_format_not_object() {
        let result = parse_environments_str(r#"["not", "an", "object"]"#);
        assert!(matches!(result, Err(EnvError::InvalidFormat(_))));
    }

    #[test]
    fn test_null_environment_is_skipped() {
        let envs = parse_environments_str(r#"{"dev": null, "prod": {}}"#).unwrap();
        assert_eq!(envs.list_environments(), vec!["prod"]);
    }

    #[test]
    fn test_variable_with_references() {
        let envs = parse_environments_str(
            r#"{"dev": {"baseUrl": "http://localhost:3000", "apiUrl": "{{baseUrl}}/api"}}"#,
        )
        .unwrap();
        // Stored as written; substitution happens in the resolver
        assert_eq!(
            envs.get_environment("dev").unwrap().get("apiUrl").unwrap(),
            "{{baseUrl}}/api"
        );
    }

    #[test]
    fn test_find_environment_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_environment_file(temp_dir.path()).is_none());
    }

    #[test]
    fn test_find_alternative_filename() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_env_file(temp_dir.path(), "http-client.env.json", r#"{"dev": {}}"#);
        assert_eq!(find_environment_file(temp_dir.path()), Some(path));
    }

    #[test]
    fn test_dotted_filename_is_preferred() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_env_file(temp_dir.path(), "http-client.env.json", r#"{"b": {}}"#);
        let preferred = create_temp_env_file(temp_dir.path(), ".http-client-env.json", r#"{"a": {}}"#);
        assert_eq!(find_environment_file(temp_dir.path()), Some(preferred));
    }

    #[test]
    fn test_find_environment_file_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        let sub_dir = temp_dir.path().join("sub");
        fs::create_dir(&sub_dir).unwrap();
        create_temp_env_file(temp_dir.path(), ".http-client-env.json", r#"{"dev": {}}"#);

        let found = find_environment_file(&sub_dir).unwrap();
        let envs = load_environment_file(&found).unwrap();
        assert!(envs.has_environment("dev"));
    }

    #[test]
    fn test_find_environment_file_max_depth() {
        let temp_dir = TempDir::new().unwrap();

        let mut current = temp_dir.path().to_path_buf();
        for i in 0..5 {
            current = current.join(format!("level{}", i));
            fs::create_dir(&current).unwrap();
        }
        create_temp_env_file(temp_dir.path(), ".http-client-env.json", r#"{"dev": {}}"#);

        let level3 = temp_dir.path().join("level0/level1/level2");
        assert!(find_environment_file(&level3).is_some());

        let level5 = temp_dir.path().join("level0/level1/level2/level3/level4");
        assert!(find_environment_file(&level5).is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.json");
        assert_eq!(
            load_environment_file(&missing),
            Err(EnvError::FileNotFound(missing.clone()))
        );
    }
}
