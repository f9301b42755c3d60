//! Text cell helpers: markup stripping, email shape, completion lists.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::CellValue;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    // An unterminated trailing `<...` is stripped too.
    Regex::new(r"<[^>]*>?").expect("markup pattern is valid")
});

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Separator used inside a completion-list cell.
pub const LIST_SEPARATOR: char = ',';

/// Strips markup sequences and surrounding whitespace.
///
/// # Examples
///
/// ```
/// use limit_pacer::decode::sanitize;
///
/// assert_eq!(sanitize("<b>Report</b>  "), "Report");
/// assert_eq!(sanitize("  plain "), "plain");
/// assert_eq!(sanitize("a <script"), "a");
/// ```
pub fn sanitize(raw: &str) -> String {
    MARKUP.replace_all(raw, "").trim().to_string()
}

/// Sanitized text of a cell; blank and empty cells yield `""`.
pub fn sanitize_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        other => sanitize(&other.as_text()),
    }
}

/// Returns `true` for addresses shaped like `local@domain.tld`.
pub fn is_plausible_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// Splits a completion-list cell into member ids.
///
/// Pieces are trimmed and empty pieces dropped; order is kept and duplicates
/// are left as stored.
///
/// # Examples
///
/// ```
/// use limit_pacer::decode::parse_completion_list;
///
/// assert_eq!(parse_completion_list("2, 7,,"), vec!["2", "7"]);
/// assert!(parse_completion_list("").is_empty());
/// ```
pub fn parse_completion_list(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Completion list of a cell; numeric cells hold a single id.
pub fn completion_list_cell(cell: &CellValue) -> Vec<String> {
    match cell {
        CellValue::Empty => Vec::new(),
        other => parse_completion_list(&other.as_text()),
    }
}

/// Joins member ids into the text stored in a completion-list cell.
///
/// # Examples
///
/// ```
/// use limit_pacer::decode::encode_completion_list;
///
/// assert_eq!(encode_completion_list(&["2".to_string(), "7".to_string()]), "2,7");
/// assert_eq!(encode_completion_list(&[]), "");
/// ```
pub fn encode_completion_list(ids: &[String]) -> String {
    ids.join(",")
}
