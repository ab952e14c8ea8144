//! Gene-set description checks.

use thiserror::Error;

pub const MIN_WORDS: usize = 100;
pub const MAX_WORDS: usize = 250;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptionError {
    #[error("The gene set description must be at least 100 words")]
    TooShort { words: usize },
    #[error("The gene set description can be at most 250 words")]
    TooLong { words: usize },
}

/// Whitespace-separated, non-empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn validate_description(text: &str) -> Result<usize, DescriptionError> {
    match word_count(text) {
        n if n < MIN_WORDS => Err(DescriptionError::TooShort { words: n }),
        n if n > MAX_WORDS => Err(DescriptionError::TooLong { words: n }),
        n => Ok(n),
    }
}
