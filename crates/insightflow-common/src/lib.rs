//! InsightFlow Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, tabular parsing, and logging for the InsightFlow workspace.
//!
//! # Overview
//!
//! - **Types**: Dynamically typed cell values, rows, and column metadata
//! - **Tabular**: Preview extraction from uploaded CSV and Excel files
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Error Handling**: Common error and result types
//!
//! # Example
//!
//! ```no_run
//! use insightflow_common::tabular::parse_csv;
//!
//! fn inspect(bytes: &[u8]) -> insightflow_common::Result<()> {
//!     let preview = parse_csv(bytes)?;
//!     tracing::info!(rows = preview.row_count, columns = preview.column_count, "Parsed upload");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod tabular;
pub mod types;

// Re-export commonly used types
pub use error::{InsightflowError, Result};
pub use types::{ColumnMeta, ColumnType, Row, ScalarValue};
