//! Request line parsing: `METHOD URL [HTTP/VERSION]`.
//!
//! The method is optional (defaults to GET) and so is the version. An unknown
//! method is still reported as `INVALID_METHOD` even though parsing carries on
//! with GET, so the fallback never hides a typo.

use super::error::{ParserError, ParserErrorKind};
use super::ParseResult;
use crate::models::HttpMethod;
use once_cell::sync::Lazy;
use regex::Regex;

static HTTP_VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HTTP/\d(?:\.\d)?$").expect("Failed to compile version regex"));

static URL_PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{.+?\}\}").expect("Failed to compile placeholder regex"));

const URL_SCHEMES: &[&str] = &["http://", "https://", "ws://", "wss://"];

/// The components of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: HttpMethod,
    pub url: String,
    pub http_version: Option<String>,
}

/// Parses the request line found at `line_num`.
///
/// # Returns
///
/// `data` is `None` only for an empty line. Otherwise a best-effort
/// `RequestLine` is returned, with `INVALID_METHOD`/`INVALID_URL` errors
/// recorded alongside it.
///
/// # Examples
///
/// ```
/// use httprex::models::HttpMethod;
/// use httprex::parser::request_line::parse_request_line;
///
/// let result = parse_request_line("post https://example.com HTTP/1.1", 1);
/// let line = result.data.unwrap();
/// assert_eq!(line.method, HttpMethod::POST);
/// assert_eq!(line.http_version.as_deref(), Some("HTTP/1.1"));
/// ```
pub fn parse_request_line(line: &str, line_num: usize) -> ParseResult<RequestLine> {
    let mut errors = Vec::new();
    let parts: Vec<&str> = line.split_whitespace().collect();

    let (method, url, http_version) = match parts.as_slice() {
        [] => {
            errors.push(
                ParserError::new(ParserErrorKind::SyntaxError, "Request line is empty")
                    .at_line(line_num)
                    .with_context(line),
            );
            return ParseResult::failed(errors);
        }
        [url] => (HttpMethod::GET, *url, None),
        [first, second] => {
            if let Some(method) = HttpMethod::from_str(first) {
                (method, *second, None)
            } else if is_http_version(second) {
                (HttpMethod::GET, *first, Some(second.to_string()))
            } else {
                let method = validate_method(first, line, line_num, &mut errors);
                (method, *second, None)
            }
        }
        [first, url, .., last] => {
            let method = validate_method(first, line, line_num, &mut errors);
            let version = is_http_version(last).then(|| last.to_string());
            (method, *url, version)
        }
    };

    if !is_valid_url(url) {
        errors.push(
            ParserError::new(
                ParserErrorKind::InvalidUrl,
                format!(
                    "Invalid URL format: {}. URL must start with http://, https://, ws://, wss://, /, or contain variables {{{{...}}}}",
                    url
                ),
            )
            .at_line(line_num)
            .at_column(column_of(line, url))
            .with_context(line),
        );
    }

    ParseResult::from_parts(
        RequestLine {
            method,
            url: url.to_string(),
            http_version,
        },
        errors,
    )
}

/// Returns the method for `token`, recording `INVALID_METHOD` and falling
/// back to GET when it is not recognized.
fn validate_method(
    token: &str,
    line: &str,
    line_num: usize,
    errors: &mut Vec<ParserError>,
) -> HttpMethod {
    match HttpMethod::from_str(token) {
        Some(method) => method,
        None => {
            let valid: Vec<&str> = HttpMethod::ALL.iter().map(|m| m.as_str()).collect();
            errors.push(
                ParserError::new(
                    ParserErrorKind::InvalidMethod,
                    format!(
                        "Invalid HTTP method: {}. Valid methods are: {}",
                        token,
                        valid.join(", ")
                    ),
                )
                .at_line(line_num)
                .at_column(column_of(line, token))
                .with_context(line),
            );
            HttpMethod::GET
        }
    }
}

/// Checks the `HTTP/x` or `HTTP/x.y` version grammar.
pub fn is_http_version(token: &str) -> bool {
    HTTP_VERSION_REGEX.is_match(token)
}

/// A URL is acceptable if it is absolute (with a known scheme and something
/// after it), an absolute path, or contains a placeholder.
pub fn is_valid_url(url: &str) -> bool {
    let has_scheme = URL_SCHEMES
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme));

    has_scheme || url.starts_with('/') || URL_PLACEHOLDER_REGEX.is_match(url)
}

fn column_of(line: &str, token: &str) -> usize {
    line.find(token)
        .map(|byte_idx| line[..byte_idx].chars().count())
        .unwrap_or(0)
}
