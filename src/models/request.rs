//! HTTP request data models.
//!
//! This module defines the structures produced by the document parser: the
//! request method, the parsed request itself, its body, and the variable
//! references found in the source text.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered name → value map used for headers and variables.
pub type VariableMap = IndexMap<String, String>;

/// HTTP request method.
///
/// Represents all standard HTTP methods as defined in RFC 7231 and RFC 5789.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
    /// HTTP OPTIONS method - describe communication options
    OPTIONS,
    /// HTTP HEAD method - retrieve headers only
    HEAD,
    /// HTTP TRACE method - perform a message loop-back test
    TRACE,
    /// HTTP CONNECT method - establish a tunnel to the server
    CONNECT,
}

impl HttpMethod {
    /// All supported methods, in the order they are listed in diagnostics.
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::GET,
        HttpMethod::HEAD,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::DELETE,
        HttpMethod::CONNECT,
        HttpMethod::OPTIONS,
        HttpMethod::TRACE,
        HttpMethod::PATCH,
    ];

    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::TRACE => "TRACE",
            HttpMethod::CONNECT => "CONNECT",
        }
    }

    /// Parses a string into an HttpMethod.
    ///
    /// Matching is case-insensitive.
    ///
    /// # Returns
    ///
    /// `Some(HttpMethod)` if the string is a valid HTTP method, `None` otherwise.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            "HEAD" => Some(HttpMethod::HEAD),
            "TRACE" => Some(HttpMethod::TRACE),
            "CONNECT" => Some(HttpMethod::CONNECT),
            _ => None,
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::GET
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `{{name}}` occurrence found in request text.
///
/// Informational only: it records where a placeholder appears, not its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableReference {
    /// Trimmed placeholder name
    pub name: String,
    /// 1-based line number
    pub line: usize,
    /// 0-based column of the opening `{{`
    pub column: usize,
}

/// Request body in one of its three shapes.
///
/// Consumers must handle every variant; an empty body is `Absent`, never an
/// empty `Text`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RequestBody {
    /// No body lines, or only blank ones
    #[default]
    Absent,
    /// Raw or re-encoded text
    Text(String),
    /// Successfully parsed JSON
    Structured(serde_json::Value),
}

impl RequestBody {
    /// Returns `true` for [`RequestBody::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, RequestBody::Absent)
    }

    /// Returns the text content, if this is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RequestBody::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the structured value, if this is a parsed JSON body.
    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            RequestBody::Structured(value) => Some(value),
            _ => None,
        }
    }

    /// Renders the body as the bytes-to-send string.
    ///
    /// Structured bodies are serialized compactly; `Absent` yields `None`.
    pub fn to_wire_string(&self) -> Option<String> {
        match self {
            RequestBody::Absent => None,
            RequestBody::Text(text) => Some(text.clone()),
            RequestBody::Structured(value) => Some(value.to_string()),
        }
    }
}

/// The source lines a request was built from, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawRequest {
    pub request_line: String,
    pub header_lines: Vec<String>,
    pub body_lines: Vec<String>,
}

/// A request parsed from a request document.
///
/// Produced by the document parser and never mutated afterwards: resolving
/// variables yields a new `ParsedRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRequest {
    /// HTTP method (defaults to GET when the request line omits it).
    pub method: HttpMethod,

    /// Target URL.
    ///
    /// May still contain `{{variableName}}` placeholders.
    pub url: String,

    /// Optional HTTP version token from the request line, e.g. "HTTP/1.1".
    pub http_version: Option<String>,

    /// Request headers in source order, keyed by lower-cased name.
    pub headers: VariableMap,

    /// Request body.
    pub body: RequestBody,

    /// Every placeholder occurrence in the request text, duplicates included.
    pub variables: Vec<VariableReference>,

    /// Name from a `# @name identifier` comment.
    pub name: Option<String>,

    /// Original request/header/body lines.
    pub raw: RawRequest,
}

impl ParsedRequest {
    /// Creates a request with no headers, no body and no recorded variables.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            http_version: None,
            headers: VariableMap::new(),
            body: RequestBody::Absent,
            variables: Vec::new(),
            name: None,
            raw: RawRequest::default(),
        }
    }

    /// Gets a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets the Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Checks if the request has a body.
    pub fn has_body(&self) -> bool {
        !self.body.is_absent()
    }
}

/// The result of parsing a multi-request document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedRequestFile {
    /// Successfully parsed requests, in document order.
    pub requests: Vec<ParsedRequest>,

    /// `@name = value` assignments; the last assignment of a name wins.
    pub file_variables: VariableMap,

    /// Errors from every block, including blocks that failed to parse.
    pub errors: Vec<crate::parser::error::ParserError>,
}

impl ParsedRequestFile {
    /// Finds a request by its `# @name`.
    pub fn request_by_name(&self, name: &str) -> Option<&ParsedRequest> {
        self.requests
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
    }
}
