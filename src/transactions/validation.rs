//! Client-side input checks for entry creation.
//!
//! Rejected input never reaches the signer or the node.

use thiserror::Error;

/// Longest accepted title, in code points.
pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("title cannot be longer than {max} characters (got {actual})")]
    TitleTooLong { max: usize, actual: usize },

    #[error("url cannot be empty")]
    EmptyUrl,
}

/// Check raw form values. Values are submitted as given, not trimmed.
pub fn validate_entry(title: &str, url: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let actual = title.chars().count();
    if actual > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_CHARS,
            actual,
        });
    }

    if url.trim().is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    Ok(())
}
