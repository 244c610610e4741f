//! Header block parsing.
//!
//! Supports RFC 822 style continuation lines, case-insensitive names (stored
//! lower-cased) and duplicate headers. Duplicates are joined with `", "`
//! except `set-cookie`, whose values are joined with a newline so each cookie
//! stays individually parseable.

use super::error::{ParserError, ParserErrorKind};
use crate::models::VariableMap;
use once_cell::sync::Lazy;
use regex::Regex;

static HEADER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+):\s*(.*)$").expect("Failed to compile header regex"));

/// Headers plus the errors found while reading them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedHeaders {
    pub headers: VariableMap,
    pub errors: Vec<ParserError>,
}

/// Parses header lines up to (not including) the first blank line.
///
/// Each entry is `(line_number, line)`. Malformed lines are reported as
/// `INVALID_HEADER` and skipped; parsing continues with the next line.
pub fn parse_headers(lines: &[(usize, &str)]) -> ParsedHeaders {
    let mut parsed = ParsedHeaders::default();
    let mut current: Option<(String, String)> = None;

    for (line_num, line) in lines {
        if line.trim().is_empty() {
            break;
        }

        // Continuation of the open header
        if line.starts_with(char::is_whitespace) {
            if let Some((_, value)) = current.as_mut() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line.trim());
                continue;
            }
        }

        if let Some((name, value)) = current.take() {
            insert_header(&mut parsed.headers, name, value);
        }

        match HEADER_REGEX.captures(line) {
            Some(caps) => {
                let name = caps[1].trim();
                if name.is_empty() {
                    parsed.errors.push(
                        ParserError::new(ParserErrorKind::InvalidHeader, "Header name cannot be empty")
                            .at_line(*line_num)
                            .with_context(*line),
                    );
                    continue;
                }
                current = Some((name.to_lowercase(), caps[2].trim().to_string()));
            }
            None => parsed.errors.push(
                ParserError::new(
                    ParserErrorKind::InvalidHeader,
                    "Invalid header format. Expected: \"Header-Name: value\"",
                )
                .at_line(*line_num)
                .with_context(*line),
            ),
        }
    }

    if let Some((name, value)) = current {
        insert_header(&mut parsed.headers, name, value);
    }

    parsed
}

fn insert_header(headers: &mut VariableMap, name: String, value: String) {
    match headers.get_mut(&name) {
        Some(existing) => {
            let separator = if name == "set-cookie" { "\n" } else { ", " };
            existing.push_str(separator);
            existing.push_str(&value);
        }
        None => {
            headers.insert(name, value);
        }
    }
}

/// Extracts the media type of the `content-type` header.
///
/// Parameters such as `; charset=utf-8` are stripped.
pub fn get_content_type(headers: &VariableMap) -> Option<String> {
    get_header_value(headers, "content-type").map(|value| {
        value
            .split(';')
            .next()
            .unwrap_or(value)
            .trim()
            .to_string()
    })
}

/// Looks a header up by case-insensitive name.
pub fn get_header_value<'a>(headers: &'a VariableMap, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
