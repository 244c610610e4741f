//! Request document parser.
//!
//! This module turns `.http` request text into [`ParsedRequest`] values. It
//! handles multiple requests separated by `###` lines, `#`/`//` comments,
//! `# @name` metadata, `@name = value` file variables, headers and
//! content-type aware bodies.
//!
//! Parsing never stops at the first problem. Every function returns a
//! [`ParseResult`] carrying a best-effort value and all the errors collected
//! on the way, and one failing block in a document never prevents its
//! siblings from parsing.

pub mod body;
pub mod error;
pub mod headers;
pub mod lexer;
pub mod request_line;
pub mod separators;

use crate::models::{ParsedRequest, ParsedRequestFile, RawRequest};
use body::parse_body;
use error::{ParserError, ParserErrorKind};
use headers::{get_content_type, parse_headers};
use lexer::{extract_file_variables, extract_variables, file_variables_map, is_file_variable};
use request_line::parse_request_line;
use separators::{extract_request_name, is_comment, split_requests};
use serde::{Deserialize, Serialize};

pub use headers::get_header_value;
pub use lexer::has_unresolved_variables;
pub use separators::{is_separator, remove_comments};

/// Outcome of a parse: a best-effort value plus accumulated errors.
///
/// `success` is `false` as soon as any fatal error (`INVALID_METHOD`,
/// `INVALID_URL`, `PARSE_FAILED`) was recorded. `data` can still be `Some` in
/// that case so the partially parsed value stays inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub errors: Vec<ParserError>,
}

impl<T> ParseResult<T> {
    /// A failure with no value.
    pub fn failed(errors: Vec<ParserError>) -> Self {
        Self {
            success: false,
            data: None,
            errors,
        }
    }

    /// A value whose success is decided by the fatality of `errors`.
    pub fn from_parts(data: T, errors: Vec<ParserError>) -> Self {
        Self {
            success: !errors.iter().any(ParserError::is_fatal),
            data: Some(data),
            errors,
        }
    }

    /// Converts into a strict `Result`, dropping the best-effort value of a
    /// failed parse.
    pub fn into_result(self) -> Result<T, Vec<ParserError>> {
        let ParseResult {
            success,
            data,
            errors,
        } = self;
        match (success, data) {
            (true, Some(data)) => Ok(data),
            _ => Err(errors),
        }
    }
}

/// Parses a single request.
///
/// # Examples
///
/// ```
/// use httprex::models::HttpMethod;
/// use httprex::parser::parse_request;
///
/// let result = parse_request("POST https://api.example.com/users\nContent-Type: application/json\n\n{\"name\": \"John\"}");
/// assert!(result.success);
///
/// let request = result.data.unwrap();
/// assert_eq!(request.method, HttpMethod::POST);
/// assert_eq!(request.headers["content-type"], "application/json");
/// assert!(request.body.as_structured().is_some());
/// ```
pub fn parse_request(text: &str) -> ParseResult<ParsedRequest> {
    parse_request_at(text, 1)
}

/// Parses a single request whose first line is line `first_line` of a larger
/// document. Reported line numbers are absolute.
pub fn parse_request_at(text: &str, first_line: usize) -> ParseResult<ParsedRequest> {
    if text.trim().is_empty() {
        return ParseResult::failed(vec![ParserError::new(
            ParserErrorKind::ParseFailed,
            "Input text is empty",
        )
        .at_line(first_line)]);
    }

    let text = text.replace("\r\n", "\n");
    let variables = extract_variables(&text, first_line);

    let all_lines: Vec<&str> = text.split('\n').collect();
    let name = extract_request_name(&all_lines);

    // Comments go, then anything before the request line that is blank or a
    // file variable assignment.
    let clean: Vec<(usize, &str)> = all_lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (first_line + idx, *line))
        .filter(|(_, line)| !is_comment(line))
        .skip_while(|(_, line)| line.trim().is_empty() || is_file_variable(line))
        .collect();

    let Some(&(request_line_num, request_line)) = clean.first() else {
        return ParseResult::failed(vec![ParserError::new(
            ParserErrorKind::ParseFailed,
            "No content found after removing comments",
        )
        .at_line(first_line)]);
    };

    let line_result = parse_request_line(request_line, request_line_num);
    let mut errors = line_result.errors;
    let Some(line) = line_result.data else {
        return ParseResult::failed(errors);
    };

    // Headers run up to the first blank line; the body is everything after it.
    let header_end = clean[1..]
        .iter()
        .position(|(_, line)| line.trim().is_empty())
        .map(|pos| pos + 1)
        .unwrap_or(clean.len());
    let header_lines = &clean[1..header_end];
    let body_lines: &[(usize, &str)] = if header_end + 1 < clean.len() {
        &clean[header_end + 1..]
    } else {
        &[]
    };

    let parsed_headers = parse_headers(header_lines);
    errors.extend(parsed_headers.errors);

    let content_type = get_content_type(&parsed_headers.headers);
    let body_texts: Vec<&str> = body_lines.iter().map(|(_, line)| *line).collect();
    let body_start = body_lines
        .first()
        .map(|(num, _)| *num)
        .unwrap_or(request_line_num + header_end + 1);
    let parsed_body = parse_body(&body_texts, content_type.as_deref(), body_start);
    errors.extend(parsed_body.errors);

    let request = ParsedRequest {
        method: line.method,
        url: line.url,
        http_version: line.http_version,
        headers: parsed_headers.headers,
        body: parsed_body.body,
        variables,
        name,
        raw: RawRequest {
            request_line: request_line.to_string(),
            header_lines: header_lines.iter().map(|(_, l)| l.to_string()).collect(),
            body_lines: body_texts.iter().map(|l| l.to_string()).collect(),
        },
    };

    ParseResult::from_parts(request, errors)
}

/// Parses a document that may hold several `###`-separated requests.
///
/// File variables are collected from the whole document first. Each block is
/// then parsed on its own: requests that parse successfully are kept, and the
/// errors of every block (failed or not) are aggregated. The result succeeds
/// when at least one request parsed.
///
/// # Examples
///
/// ```
/// use httprex::parser::parse_file;
///
/// let content = r#"
/// @baseUrl = https://api.example.com
///
/// ###
/// GET {{baseUrl}}/users
///
/// ###
/// # @name createUser
/// POST {{baseUrl}}/users
/// Content-Type: application/json
///
/// {"name": "John"}
/// "#;
///
/// let file = parse_file(content).data.unwrap();
/// assert_eq!(file.requests.len(), 2);
/// assert_eq!(file.file_variables["baseUrl"], "https://api.example.com");
/// assert!(file.request_by_name("createUser").is_some());
/// ```
pub fn parse_file(text: &str) -> ParseResult<ParsedRequestFile> {
    if text.trim().is_empty() {
        return ParseResult::failed(vec![ParserError::new(
            ParserErrorKind::ParseFailed,
            "Input text is empty",
        )
        .at_line(1)]);
    }

    let text = text.replace("\r\n", "\n");
    let lines: Vec<&str> = text.split('\n').collect();
    let file_variables = file_variables_map(&extract_file_variables(&lines));

    let blocks = split_requests(&text);
    let mut requests = Vec::new();
    let mut errors = Vec::new();

    if blocks.is_empty() {
        errors.push(
            ParserError::new(ParserErrorKind::ParseFailed, "No requests found in file").at_line(1),
        );
    }

    for block in &blocks {
        let result = parse_request_at(&block.content, block.start_line);
        match (result.success, result.data) {
            (true, Some(mut request)) => {
                if block.name.is_some() {
                    request.name = block.name.clone();
                }
                requests.push(request);
            }
            _ => log::debug!(
                "Skipping request block at lines {}-{}: {} error(s)",
                block.start_line,
                block.end_line,
                result.errors.len()
            ),
        }
        errors.extend(result.errors);
    }

    log::debug!(
        "Parsed {} of {} request block(s), {} error(s)",
        requests.len(),
        blocks.len(),
        errors.len()
    );

    ParseResult {
        success: !requests.is_empty(),
        data: Some(ParsedRequestFile {
            requests,
            file_variables,
            errors: errors.clone(),
        }),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, RequestBody};
    use serde_json::json;

    #[test]
    fn test_parse_simple_get() {
        let result = parse_request("GET https://api.example.com/users");
        assert!(result.success);
        assert!(result.errors.is_empty());

        let request = result.data.unwrap();
        assert_eq!(request.method, HttpMethod::GET);
        assert_eq!(request.url, "https://api.example.com/users");
        assert!(request.headers.is_empty());
        assert_eq!(request.body, RequestBody::Absent);
    }

    #[test]
    fn test_parse_request_with_headers_and_json_body() {
        let text = "POST https://api.example.com/users HTTP/1.1\nContent-Type: application/json\nAuthorization: Bearer {{token}}\n\n{\n  \"name\": \"{{name}}\"\n}";
        let result = parse_request(text);
        assert!(result.success);

        let request = result.data.unwrap();
        assert_eq!(request.http_version.as_deref(), Some("HTTP/1.1"));
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.body, RequestBody::Structured(json!({"name": "{{name}}"})));

        let names: Vec<&str> = request.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["token", "name"]);
        assert_eq!(request.variables[0].line, 3);
        assert_eq!(request.variables[1].line, 6);

        assert_eq!(request.raw.request_line, "POST https://api.example.com/users HTTP/1.1");
        assert_eq!(request.raw.header_lines.len(), 2);
        assert_eq!(request.raw.body_lines.len(), 3);
    }

    #[test]
    fn test_parse_request_with_name_and_comments() {
        let text = "# @name getUser\n// fetch one user\nGET /users/1\n# trailing note\nAccept: */*";
        let request = parse_request(text).data.unwrap();
        assert_eq!(request.name.as_deref(), Some("getUser"));
        assert_eq!(request.url, "/users/1");
        assert_eq!(request.headers["accept"], "*/*");
    }

    #[test]
    fn test_invalid_json_body_fails_but_keeps_raw_text() {
        let result = parse_request("POST https://x\nContent-Type: application/json\n\n{invalid}");
        assert!(!result.success);
        assert!(result
            .errors
            .iter()
            .any(|e| e.kind == ParserErrorKind::ParseFailed));
        assert_eq!(result.errors[0].line, Some(4));
        assert_eq!(
            result.data.unwrap().body,
            RequestBody::Text("{invalid}".to_string())
        );
    }

    #[test]
    fn test_invalid_header_does_not_fail_request() {
        let result = parse_request("GET https://example.com\nNoColonHere\nAccept: */*");
        assert!(result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ParserErrorKind::InvalidHeader);
        assert_eq!(result.errors[0].line, Some(2));
    }

    #[test]
    fn test_invalid_method_fails_request() {
        let result = parse_request("INVALID https://example.com");
        assert!(!result.success);
        assert_eq!(result.errors[0].kind, ParserErrorKind::InvalidMethod);
        assert_eq!(result.data.unwrap().method, HttpMethod::GET);
    }

    #[test]
    fn test_empty_input() {
        let result = parse_request("  \n ");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.errors[0].message, "Input text is empty");
    }

    #[test]
    fn test_only_comments() {
        let result = parse_request("# nothing\n// here");
        assert!(!result.success);
        assert_eq!(
            result.errors[0].message,
            "No content found after removing comments"
        );
    }

    #[test]
    fn test_leading_assignments_are_skipped() {
        let result = parse_request("@host = example.com\n\nGET https://{{host}}/");
        assert!(result.success);
        assert_eq!(result.data.unwrap().url, "https://{{host}}/");
    }

    #[test]
    fn test_crlf_input() {
        let result = parse_request("POST /a\r\nContent-Type: text/plain\r\n\r\nhello\r\nworld");
        let request = result.data.unwrap();
        assert_eq!(request.headers["content-type"], "text/plain");
        assert_eq!(request.body, RequestBody::Text("hello\nworld".to_string()));
    }

    #[test]
    fn test_form_body() {
        let text = "POST /login\nContent-Type: application/x-www-form-urlencoded\n\nuser={{user}}\n&pass=p@ss word";
        let request = parse_request(text).data.unwrap();
        assert_eq!(
            request.body,
            RequestBody::Text("user={{user}}&pass=p%40ss+word".to_string())
        );
    }

    #[test]
    fn test_into_result() {
        assert!(parse_request("GET /ok").into_result().is_ok());

        let errors = parse_request("GET nope").into_result().unwrap_err();
        assert_eq!(errors[0].kind, ParserErrorKind::InvalidUrl);
    }

    #[test]
    fn test_parse_file_multiple_requests() {
        let text = "@baseUrl = https://api.example.com\n@baseUrl = https://override.example.com\n\n###\nGET {{baseUrl}}/users\n\n###\n# @name create\nPOST {{baseUrl}}/users\nContent-Type: application/json\n\n{\"a\": 1}";
        let result = parse_file(text);
        assert!(result.success);

        let file = result.data.unwrap();
        assert_eq!(file.requests.len(), 2);
        assert_eq!(file.file_variables["baseUrl"], "https://override.example.com");
        assert_eq!(file.requests[1].name.as_deref(), Some("create"));
        assert_eq!(file.requests[0].variables[0].line, 5);
    }

    #[test]
    fn test_parse_file_isolates_failing_block() {
        let text = "INVALID https://x\n\n###\n\nGET https://y";
        let result = parse_file(text);
        assert!(result.success);

        let file = result.data.unwrap();
        assert_eq!(file.requests.len(), 1);
        assert_eq!(file.requests[0].url, "https://y");
        assert!(file
            .errors
            .iter()
            .any(|e| e.kind == ParserErrorKind::InvalidMethod && e.line == Some(1)));
    }

    #[test]
    fn test_parse_file_reports_absolute_lines() {
        let text = "GET /a\n\n###\nPOST /b\nContent-Type: application/json\n\n{broken";
        let result = parse_file(text);
        let error = result
            .errors
            .iter()
            .find(|e| e.kind == ParserErrorKind::ParseFailed)
            .unwrap();
        assert_eq!(error.line, Some(7));
    }

    #[test]
    fn test_parse_file_without_requests() {
        let result = parse_file("@only = variables\n# and comments");
        assert!(!result.success);
        let file = result.data.unwrap();
        assert!(file.requests.is_empty());
        assert_eq!(file.file_variables["only"], "variables");
        assert_eq!(result.errors[0].message, "No requests found in file");
    }

    #[test]
    fn test_parse_file_all_blocks_fail() {
        let result = parse_file("GET nope\n###\nFOO bar");
        assert!(!result.success);
        assert!(result.data.unwrap().requests.is_empty());
        assert!(result.errors.len() >= 2);
    }

    #[test]
    fn test_parse_file_empty() {
        let result = parse_file("");
        assert!(!result.success);
        assert!(result.data.is_none());
    }
}
