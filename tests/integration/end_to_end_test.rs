//! End-to-end integration tests for httprex
//!
//! These tests go from a request document on disk, through parsing and the
//! environment file next to it, to fully resolved requests.

use super::{create_workspace, path_in};
use httprex::config::{load_config, load_config_file};
use httprex::models::{HttpMethod, RequestBody};
use httprex::parser::error::ParserErrorKind;
use httprex::parser::{parse_file, parse_request};
use httprex::session::Session;
use httprex::variables::{VariableContext, VariableResolver};
use serde_json::json;
use std::fs;

const ENV_FILE: &str = r#"{
    "$shared": {
        "apiVersion": "v1",
        "contentType": "application/json"
    },
    "local": {
        "baseUrl": "http://localhost:3000"
    },
    "production": {
        "baseUrl": "https://api.example.com",
        "apiVersion": "v2"
    }
}"#;

const DOCUMENT: &str = r#"@userId = 42
@limit = 10

###
# @name getUser
GET {{baseUrl}}/{{apiVersion}}/users/{{userId}} HTTP/1.1
Accept: {{contentType}}

###
# @name createUser
POST {{baseUrl}}/{{apiVersion}}/users
Content-Type: application/json
X-Request-Id: {{$guid}}

{
  "name": "Alice",
  "limit": "{{limit}}",
  "tags": ["{{apiVersion}}", "new"]
}

###
# @name login
POST {{baseUrl}}/login
Content-Type: application/x-www-form-urlencoded

user={{userId}}&email=john%40example.com
"#;

#[test]
fn test_parse_multi_request_document() {
    let result = parse_file(DOCUMENT);
    assert!(result.success, "errors: {:?}", result.errors);

    let file = result.data.unwrap();
    assert_eq!(file.requests.len(), 3);
    assert_eq!(file.file_variables["userId"], "42");
    assert_eq!(file.file_variables["limit"], "10");

    let get_user = file.request_by_name("getUser").unwrap();
    assert_eq!(get_user.method, HttpMethod::GET);
    assert_eq!(get_user.http_version.as_deref(), Some("HTTP/1.1"));
    assert!(get_user.body.is_absent());

    let create_user = file.request_by_name("createUser").unwrap();
    assert_eq!(create_user.method, HttpMethod::POST);
    assert_eq!(
        create_user.body.as_structured().unwrap()["tags"],
        json!(["{{apiVersion}}", "new"])
    );

    let login = file.request_by_name("login").unwrap();
    assert_eq!(
        login.body.as_text(),
        Some("user={{userId}}&email=john%2540example.com")
    );
}

#[tokio::test]
async fn test_document_resolves_against_workspace_environment() {
    let workspace = create_workspace(&[
        ("http-client.env.json", ENV_FILE),
        ("requests/api.http", DOCUMENT),
    ]);
    let settings = json!({"httprex": {"defaultEnvironment": "production"}});
    let config = load_config(Some(settings)).unwrap();

    // The environment file sits one level above the document
    let session = Session::from_config(config, Some(path_in(&workspace, "requests").as_path())).unwrap();
    let text = fs::read_to_string(path_in(&workspace, "requests/api.http")).unwrap();
    let file = session.resolve_document(&text).await.data.unwrap();

    let get_user = file.request_by_name("getUser").unwrap();
    assert_eq!(get_user.url, "https://api.example.com/v2/users/42");
    assert_eq!(get_user.header("accept"), Some("application/json"));

    let create_user = file.request_by_name("createUser").unwrap();
    let request_id = create_user.header("x-request-id").unwrap();
    assert_eq!(request_id.len(), 36);
    assert_eq!(
        create_user.body,
        RequestBody::Structured(json!({
            "name": "Alice",
            "limit": "10",
            "tags": ["v2", "new"]
        }))
    );

    let login = file.request_by_name("login").unwrap();
    assert_eq!(login.body.as_text(), Some("user=42&email=john%2540example.com"));
}

#[tokio::test]
async fn test_switching_environment_changes_resolution() {
    let workspace = create_workspace(&[("http-client.env.json", ENV_FILE)]);
    let config = load_config(Some(json!({"httprex": {"autoSelectEnvironment": true}}))).unwrap();
    let session = Session::from_config(config, Some(workspace.path())).unwrap();

    let text = "GET {{baseUrl}}/{{apiVersion}}/health";
    let local = session.resolve_document(text).await.data.unwrap();
    assert_eq!(local.requests[0].url, "http://localhost:3000/v1/health");

    session.set_environment(Some("production")).unwrap();
    let production = session.resolve_document(text).await.data.unwrap();
    assert_eq!(production.requests[0].url, "https://api.example.com/v2/health");

    session.set_environment(None).unwrap();
    let none = session.resolve_document(text).await.data.unwrap();
    assert_eq!(none.requests[0].url, text.trim_start_matches("GET "));
}

#[test]
fn test_config_file_drives_session() {
    let workspace = create_workspace(&[
        ("envs/team.json", ENV_FILE),
        (
            "httprex.json",
            r#"{"httprex": {"environmentFile": "envs/team.json", "defaultEnvironment": "local", "secrets": {"processEnv": false}}}"#,
        ),
    ]);

    let config = load_config_file(&path_in(&workspace, "httprex.json")).unwrap();
    let session = Session::from_config(config, Some(workspace.path())).unwrap();

    assert_eq!(session.environment_file(), Some(path_in(&workspace, "envs/team.json").as_path()));
    assert_eq!(
        session.environments().current_environment_name().as_deref(),
        Some("local")
    );
    assert!(session.secrets().list_providers().is_empty());
}

#[test]
fn test_invalid_block_does_not_hide_valid_ones() {
    let text = "INVALID https://x\n\n###\n\nGET https://example.com/ok\n";
    let result = parse_file(text);

    assert!(result.success);
    let file = result.data.unwrap();
    assert_eq!(file.requests.len(), 1);
    assert_eq!(file.requests[0].url, "https://example.com/ok");
    assert!(file
        .errors
        .iter()
        .any(|e| e.kind == ParserErrorKind::InvalidMethod));
}

#[test]
fn test_failed_json_body_is_kept_as_text() {
    let result = parse_request("POST https://x\nContent-Type: application/json\n\n{invalid}");

    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.kind == ParserErrorKind::ParseFailed));
    assert_eq!(result.data.unwrap().body, RequestBody::Text("{invalid}".to_string()));
}

#[test]
fn test_unresolved_variables_are_reported() {
    let file = parse_file(DOCUMENT).data.unwrap();
    let resolver = VariableResolver::new(VariableContext::with_file_variables(
        file.file_variables.clone(),
    ));

    let get_user = file.request_by_name("getUser").unwrap();
    assert_eq!(
        resolver.get_unresolved_variables(get_user),
        vec!["baseUrl", "apiVersion", "contentType"]
    );

    let resolved = resolver.resolve_request(get_user);
    assert_eq!(resolved.url, "{{baseUrl}}/{{apiVersion}}/users/42");
}
