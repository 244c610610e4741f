//! Placeholder and file-variable extraction.
//!
//! Finds `{{name}}` occurrences (with their positions) and `@name = value`
//! assignments in raw request text, and provides the plain substitution
//! primitive the variable resolver builds on.

use crate::models::{VariableMap, VariableReference};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Matches `{{name}}`; the name is everything up to the first `}`.
pub(crate) static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Failed to compile variable regex"));

/// Matches `@name = value`. Names are word characters only (no hyphens).
pub(crate) static FILE_VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@(\w+)\s*=\s*(.+)$").expect("Failed to compile file variable regex"));

/// A `@name = value` assignment found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVariable {
    pub name: String,
    pub value: String,
    /// 1-based line number of the assignment
    pub line: usize,
}

/// Extracts every `{{name}}` occurrence in `text`.
///
/// Line numbers start at `start_line`; columns are 0-based character offsets of
/// the opening braces. Duplicates are preserved in document order.
///
/// # Examples
///
/// ```
/// use httprex::parser::lexer::extract_variables;
///
/// let vars = extract_variables("GET {{baseUrl}}/users/{{ id }}", 1);
/// assert_eq!(vars.len(), 2);
/// assert_eq!(vars[1].name, "id");
/// assert_eq!(vars[0].column, 4);
/// ```
pub fn extract_variables(text: &str, start_line: usize) -> Vec<VariableReference> {
    let mut variables = Vec::new();

    for (idx, line) in text.split('\n').enumerate() {
        for cap in VARIABLE_REGEX.captures_iter(line) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            variables.push(VariableReference {
                name: name.as_str().trim().to_string(),
                line: start_line + idx,
                column: line[..whole.start()].chars().count(),
            });
        }
    }

    variables
}

/// Extracts `@name = value` assignments from `lines`, in order.
///
/// Lines are trimmed before matching; anything that is not an assignment
/// (comments, blank lines, requests) is skipped.
pub fn extract_file_variables(lines: &[&str]) -> Vec<FileVariable> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            parse_file_variable(line).map(|(name, value)| FileVariable {
                name,
                value,
                line: idx + 1,
            })
        })
        .collect()
}

/// Collapses assignments into a map where the last assignment of a name wins.
pub fn file_variables_map(variables: &[FileVariable]) -> VariableMap {
    let mut map = VariableMap::new();
    for var in variables {
        map.insert(var.name.clone(), var.value.clone());
    }
    map
}

/// Parses a single `@name = value` line.
pub fn parse_file_variable(line: &str) -> Option<(String, String)> {
    let caps = FILE_VARIABLE_REGEX.captures(line.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let value = caps.get(2)?.as_str().trim().to_string();
    Some((name, value))
}

/// Returns `true` if `line` is a file-variable assignment.
pub fn is_file_variable(line: &str) -> bool {
    FILE_VARIABLE_REGEX.is_match(line.trim())
}

/// Replaces every `{{name}}` whose trimmed name is in `variables`.
///
/// Unknown placeholders are left exactly as written, braces included.
pub fn resolve_variables(text: &str, variables: &VariableMap) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }

    VARIABLE_REGEX
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].trim();
            match variables.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Returns `true` if `text` still contains a `{{...}}` placeholder.
pub fn has_unresolved_variables(text: &str) -> bool {
    VARIABLE_REGEX.is_match(text)
}
