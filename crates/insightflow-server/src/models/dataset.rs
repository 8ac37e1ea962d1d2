//! Dataset model

use chrono::{DateTime, Utc};
use insightflow_common::{tabular::PREVIEW_ROW_LIMIT, ColumnMeta, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded dataset with its preview sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file_name: String,
    /// MIME type reported by the client
    pub file_type: String,
    /// Size in bytes
    pub file_size: i64,
    pub row_count: i64,
    pub column_count: i64,
    pub columns: Vec<ColumnMeta>,
    pub preview: Vec<Row>,
    pub created_at: DateTime<Utc>,
}

/// Violations of the dataset sample invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetInvariantError {
    #[error("Preview holds {len} rows, at most {max} are allowed")]
    PreviewTooLarge { len: usize, max: usize },

    #[error("Dataset declares {declared} columns but describes {actual}")]
    ColumnCountMismatch { declared: i64, actual: usize },
}

impl Dataset {
    /// Check the sample invariants: a bounded preview and a consistent column count
    pub fn check_invariants(&self) -> Result<(), DatasetInvariantError> {
        if self.preview.len() > PREVIEW_ROW_LIMIT {
            return Err(DatasetInvariantError::PreviewTooLarge {
                len: self.preview.len(),
                max: PREVIEW_ROW_LIMIT,
            });
        }

        if usize::try_from(self.column_count).ok() != Some(self.columns.len()) {
            return Err(DatasetInvariantError::ColumnCountMismatch {
                declared: self.column_count,
                actual: self.columns.len(),
            });
        }

        Ok(())
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id,
            name: self.name.clone(),
            row_count: self.row_count,
            column_count: self.column_count,
            created_at: self.created_at,
        }
    }
}

/// List view of a dataset (no columns or preview)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: Uuid,
    pub name: String,
    pub row_count: i64,
    pub column_count: i64,
    pub created_at: DateTime<Utc>,
}
