//! Content-type aware body parsing.
//!
//! JSON bodies are syntax-checked and parsed, XML gets a minimal
//! well-formedness check, and form bodies are re-encoded exactly once. A body
//! that fails its check is still returned as text so nothing is lost.

use super::error::{snippet, ParserError, ParserErrorKind};
use super::lexer::VARIABLE_REGEX;
use crate::models::RequestBody;
use url::form_urlencoded;

/// Characters of the body quoted in a `PARSE_FAILED` error.
const CONTEXT_CHARS: usize = 100;

/// Body plus the errors found while parsing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBody {
    pub body: RequestBody,
    pub errors: Vec<ParserError>,
}

impl ParsedBody {
    fn ok(body: RequestBody) -> Self {
        Self {
            body,
            errors: Vec::new(),
        }
    }
}

/// Body interpretation chosen from the media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Xml,
    FormUrlEncoded,
    Raw,
}

impl BodyKind {
    /// Chooses the body kind for a media type (parameters are ignored).
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return BodyKind::Raw;
        };
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();

        if media_type == "application/json" || media_type.ends_with("+json") {
            BodyKind::Json
        } else if media_type == "application/xml" || media_type == "text/xml" {
            BodyKind::Xml
        } else if media_type == "application/x-www-form-urlencoded" {
            BodyKind::FormUrlEncoded
        } else {
            BodyKind::Raw
        }
    }
}

/// Parses body lines according to `content_type`.
///
/// `start_line` is the line number of the first body line, used for errors.
/// Blank-only input yields [`RequestBody::Absent`].
pub fn parse_body(lines: &[&str], content_type: Option<&str>, start_line: usize) -> ParsedBody {
    if lines.iter().all(|line| line.trim().is_empty()) {
        return ParsedBody::default();
    }

    let raw = lines.join("\n");

    match BodyKind::from_content_type(content_type) {
        BodyKind::Json => parse_json(raw, start_line),
        BodyKind::Xml => parse_xml(&raw, start_line),
        BodyKind::FormUrlEncoded => ParsedBody::ok(RequestBody::Text(encode_form_body(&raw))),
        BodyKind::Raw => ParsedBody::ok(RequestBody::Text(raw)),
    }
}

fn parse_json(raw: String, start_line: usize) -> ParsedBody {
    match serde_json::from_str::<serde_json::Value>(raw.trim()) {
        Ok(value) => ParsedBody::ok(RequestBody::Structured(value)),
        Err(e) => {
            log::debug!("JSON body at line {} failed to parse: {}", start_line, e);
            let error = ParserError::new(ParserErrorKind::ParseFailed, format!("Invalid JSON: {}", e))
                .at_line(start_line)
                .with_context(snippet(&raw, CONTEXT_CHARS));
            ParsedBody {
                body: RequestBody::Text(raw),
                errors: vec![error],
            }
        }
    }
}

fn parse_xml(raw: &str, start_line: usize) -> ParsedBody {
    let trimmed = raw.trim();
    let mut errors = Vec::new();

    if !trimmed.starts_with('<') || !trimmed.ends_with('>') {
        errors.push(
            ParserError::new(
                ParserErrorKind::ParseFailed,
                "Invalid XML: Must start with < and end with >",
            )
            .at_line(start_line)
            .with_context(snippet(trimmed, CONTEXT_CHARS)),
        );
    }

    ParsedBody {
        body: RequestBody::Text(trimmed.to_string()),
        errors,
    }
}

/// Re-encodes a form body written as `key=value` lines.
///
/// Lines may start with `&` and may hold several `&`-separated pairs. Keys and
/// values are taken literally and percent-encoded exactly once, so an already
/// encoded `%40` becomes `%2540`. `{{...}}` placeholders are kept verbatim so
/// they can still be resolved later.
pub fn encode_form_body(raw: &str) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        let line = line.strip_prefix('&').unwrap_or(line);

        for pair in line.split('&') {
            if pair.trim().is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((key, value)) => pairs.push((key.trim().to_string(), value.trim().to_string())),
                None => pairs.push((pair.trim().to_string(), String::new())),
            }
        }
    }

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Form-encodes `text`, leaving placeholders untouched.
fn encode_component(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    let mut last = 0;

    for placeholder in VARIABLE_REGEX.find_iter(text) {
        encoded.extend(form_urlencoded::byte_serialize(text[last..placeholder.start()].as_bytes()));
        encoded.push_str(placeholder.as_str());
        last = placeholder.end();
    }
    encoded.extend(form_urlencoded::byte_serialize(text[last..].as_bytes()));

    encoded
}
