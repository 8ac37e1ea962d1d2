//! Shared utilities and types for feature modules
//!
//! - **pagination**: page parameters and response metadata for list queries
//! - **validation**: request field validation
//! - **test_helpers**: fixtures and fakes (test-only)

pub mod pagination;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use pagination::{Paginated, PaginationMetadata, PaginationParams};
pub use validation::{
    parse_id, require_field, validate_name, MissingFieldError, NameValidationError,
    MAX_NAME_LENGTH,
};
