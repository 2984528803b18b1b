use thiserror::Error;

/// Errors that can occur when parsing filter expressions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("Unexpected end of filter expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("Empty field name at position {0}")]
    EmptyName(usize),

    #[error("Unbalanced braces: missing '}}' for '{{' opened at position {0}")]
    UnclosedBrace(usize),

    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
}
