//! Error types for request document parsing.
//!
//! Parse errors are accumulated rather than returned early: every parser hands
//! back a best-effort value together with the errors it collected, so a caller
//! can still show a partially parsed request next to its diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParserErrorKind {
    /// A line that cannot be read structurally (e.g. an empty request line).
    SyntaxError,
    /// Method token is not one of the nine supported verbs.
    InvalidMethod,
    /// URL is neither absolute, an absolute path, nor a placeholder.
    InvalidUrl,
    /// Header line without a colon or with an empty name.
    InvalidHeader,
    /// Body does not match its declared content type, or nothing to parse.
    ParseFailed,
}

impl ParserErrorKind {
    /// Returns the wire name of the kind, e.g. `INVALID_METHOD`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserErrorKind::SyntaxError => "SYNTAX_ERROR",
            ParserErrorKind::InvalidMethod => "INVALID_METHOD",
            ParserErrorKind::InvalidUrl => "INVALID_URL",
            ParserErrorKind::InvalidHeader => "INVALID_HEADER",
            ParserErrorKind::ParseFailed => "PARSE_FAILED",
        }
    }

    /// Whether an error of this kind marks the containing request as failed.
    ///
    /// `SyntaxError` is only fatal on the request line itself, which the
    /// document parser checks separately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParserErrorKind::InvalidMethod
                | ParserErrorKind::InvalidUrl
                | ParserErrorKind::ParseFailed
        )
    }
}

impl fmt::Display for ParserErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic produced while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserError {
    /// Error category
    #[serde(rename = "type")]
    pub kind: ParserErrorKind,
    /// Human-readable description
    pub message: String,
    /// Line number in the source text (1-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Column within the line (0-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Offending source snippet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ParserError {
    pub fn new(kind: ParserErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
            context: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Shorthand for [`ParserErrorKind::is_fatal`].
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
            if let Some(column) = self.column {
                write!(f, ", column {}", column)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParserError {}

/// Truncates `text` to at most `max_chars` characters for error context.
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
