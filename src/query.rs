//! Search query normalization.

use regex::Regex;
use std::sync::LazyLock;

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_QUERY_CHARS: usize = 100;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
// Characters with meaning in tsquery or LIKE patterns
static SPECIAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[%_\\&|!():*<>']").unwrap());

/// Reasons a message cannot be used as a search query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    TooShort,
    TooLong,
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::TooShort => write!(f, "query shorter than {MIN_QUERY_CHARS} characters"),
            QueryError::TooLong => write!(f, "query longer than {MAX_QUERY_CHARS} characters"),
        }
    }
}

impl std::error::Error for QueryError {}

/// A validated, whitespace-normalized search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
}

impl SearchQuery {
    /// Normalize raw user input into a query
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let cleaned = SPECIAL.replace_all(raw, " ");
        let text = WHITESPACE.replace_all(cleaned.trim(), " ").trim().to_string();

        let chars = text.chars().count();
        if chars < MIN_QUERY_CHARS {
            return Err(QueryError::TooShort);
        }
        if chars > MAX_QUERY_CHARS {
            return Err(QueryError::TooLong);
        }

        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lowercase `LIKE` pattern matching the whole query as a substring of
    /// a lowercased column
    pub fn like_pattern(&self) -> String {
        format!("%{}%", self.text.to_lowercase())
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
