//! Shared validation utilities

use thiserror::Error;
use uuid::Uuid;

/// Longest accepted dataset or analysis name
pub const MAX_NAME_LENGTH: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    #[error("Name is required and cannot be empty")]
    Required,

    #[error("Name must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },
}

/// A required request field was absent or blank
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Field '{field}' is required")]
pub struct MissingFieldError {
    pub field: &'static str,
}

/// Validate a display name: non-blank, at most `max_length` characters
pub fn validate_name(name: &str, max_length: usize) -> Result<(), NameValidationError> {
    if name.trim().is_empty() {
        return Err(NameValidationError::Required);
    }

    if name.chars().count() > max_length {
        return Err(NameValidationError::TooLong { max_length });
    }

    Ok(())
}

/// Return the trimmed value of a required field
pub fn require_field<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, MissingFieldError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(MissingFieldError { field })
}

/// Parse an identifier supplied by a client
///
/// A malformed id can never name an existing record, so callers treat `None` as not found.
pub fn parse_id(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}
