//! Splitting of multi-request documents on `###` separator lines.
//!
//! Also holds the comment helpers shared with the document parser: `#` and
//! `//` comment lines, and the `# @name requestName` metadata comment.

use super::lexer::is_file_variable;
use once_cell::sync::Lazy;
use regex::Regex;

/// Three or more `#` alone on a line.
static SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{3,}\s*$").expect("Failed to compile separator regex"));

/// `# @name requestName`
static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\s*@name\s+(\w+)\s*$").expect("Failed to compile name regex"));

/// One request's worth of text within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBlock {
    /// Block text with surrounding blank lines removed
    pub content: String,
    /// 1-based line of the first line of `content` in the document
    pub start_line: usize,
    /// 1-based line of the last line of `content` in the document
    pub end_line: usize,
    /// Name from a `# @name` comment inside the block
    pub name: Option<String>,
}

/// Splits `text` into request blocks.
///
/// Separator lines are consumed. Blocks that are empty or hold nothing but
/// file variables and comments are dropped, so a document without separators
/// yields at most one block.
///
/// # Examples
///
/// ```
/// use httprex::parser::separators::split_requests;
///
/// let blocks = split_requests("@host = x\n\n###\nGET /a\n\n###\n# @name second\nGET /b");
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[0].start_line, 4);
/// assert_eq!(blocks[1].name.as_deref(), Some("second"));
/// ```
pub fn split_requests(text: &str) -> Vec<RequestBlock> {
    let text = text.replace("\r\n", "\n");
    let mut blocks = Vec::new();
    let mut current: Vec<(usize, &str)> = Vec::new();

    for (idx, line) in text.split('\n').enumerate() {
        if is_separator(line) {
            push_block(&mut blocks, &current);
            current.clear();
            continue;
        }
        current.push((idx + 1, line));
    }
    push_block(&mut blocks, &current);

    blocks
}

fn push_block(blocks: &mut Vec<RequestBlock>, lines: &[(usize, &str)]) {
    let Some(first) = lines.iter().position(|(_, line)| !line.trim().is_empty()) else {
        return;
    };
    let last = lines
        .iter()
        .rposition(|(_, line)| !line.trim().is_empty())
        .unwrap_or(first);
    let lines = &lines[first..=last];

    let texts: Vec<&str> = lines.iter().map(|(_, line)| *line).collect();
    if is_only_file_variables(&texts) {
        return;
    }

    blocks.push(RequestBlock {
        content: texts.join("\n"),
        start_line: lines[0].0,
        end_line: lines[lines.len() - 1].0,
        name: extract_request_name(&texts),
    });
}

/// Returns `true` if every non-blank line is a comment or a file variable.
pub fn is_only_file_variables(lines: &[&str]) -> bool {
    lines.iter().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || is_comment(trimmed) || is_file_variable(trimmed)
    })
}

/// Returns the name of the first `# @name` comment in `lines`.
pub fn extract_request_name(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find_map(|line| NAME_REGEX.captures(line.trim()).map(|caps| caps[1].to_string()))
}

/// Drops comment lines, including the `# @name` metadata line.
pub fn remove_comments<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    lines.iter().copied().filter(|line| !is_comment(line)).collect()
}

/// Returns `true` for lines starting with `#` or `//` (after trimming).
pub fn is_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('#') || trimmed.starts_with("//")
}

/// Returns `true` for `###` separator lines.
pub fn is_separator(line: &str) -> bool {
    SEPARATOR_REGEX.is_match(line.trim())
}
