//! Error types for InsightFlow

use thiserror::Error;

use crate::tabular::TabularError;

/// Result type alias for InsightFlow operations
pub type Result<T> = std::result::Result<T, InsightflowError>;

/// Main error type shared across crates
#[derive(Error, Debug)]
pub enum InsightflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tabular data error: {0}")]
    Tabular(#[from] TabularError),

    #[error("Configuration error: {0}")]
    Config(String),
}
