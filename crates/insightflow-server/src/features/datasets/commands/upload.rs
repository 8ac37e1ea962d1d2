//! Upload dataset command
//!
//! Accepts a CSV or Excel file, extracts its column types and the first rows as preview, and stores the
//! resulting dataset for the caller. Only the preview is kept; the raw file is discarded.

use chrono::Utc;
use insightflow_common::tabular::{TabularError, TabularFormat};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::shared::validation::{
    require_field, validate_name, MissingFieldError, NameValidationError, MAX_NAME_LENGTH,
};
use crate::models::Dataset;
use crate::store::{PersistenceError, SharedStore};

/// Largest accepted upload (10 MiB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A file received through the `file` multipart field
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Fields of `POST /api/v1/datasets`
#[derive(Debug, Clone, Default)]
pub struct UploadDatasetCommand {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDatasetResponse {
    pub dataset: Dataset,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadDatasetError {
    #[error("{0}")]
    MissingField(#[from] MissingFieldError),

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File is {size} bytes, at most {max} bytes are accepted")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unsupported file format '{0}', upload a CSV or Excel file")]
    UnsupportedFormat(String),

    #[error("File could not be parsed: {0}")]
    Unparsable(#[from] TabularError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl UploadDatasetCommand {
    /// Check the name and that the file is a non-empty CSV or workbook within the size limit
    pub fn validate(&self) -> Result<TabularFormat, UploadDatasetError> {
        let name = require_field(self.name.as_deref(), "name")?;
        validate_name(name, MAX_NAME_LENGTH)?;

        let file = self.file.as_ref().ok_or(MissingFieldError { field: "file" })?;
        if file.bytes.is_empty() {
            return Err(UploadDatasetError::EmptyFile);
        }
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadDatasetError::FileTooLarge {
                size: file.bytes.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }

        TabularFormat::detect(&file.file_name, file.content_type.as_deref())
            .ok_or_else(|| UploadDatasetError::UnsupportedFormat(file.file_name.clone()))
    }
}

#[tracing::instrument(skip(store, command), fields(user_id = %user_id))]
pub async fn handle(
    store: SharedStore,
    user_id: &str,
    command: UploadDatasetCommand,
) -> Result<UploadDatasetResponse, UploadDatasetError> {
    let format = command.validate()?;

    let UploadDatasetCommand {
        name,
        description,
        file,
    } = command;
    let file = file.ok_or(MissingFieldError { field: "file" })?;
    let name = name.unwrap_or_default().trim().to_string();

    let parsed = format.parse(&file.bytes)?;

    let dataset = Dataset {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        name,
        description: description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        file_type: file
            .content_type
            .unwrap_or_else(|| format.default_mime_type(&file.file_name).to_string()),
        file_size: file.bytes.len() as i64,
        file_name: file.file_name,
        row_count: parsed.row_count as i64,
        column_count: parsed.column_count as i64,
        columns: parsed.columns,
        preview: parsed.preview,
        created_at: Utc::now(),
    };

    store.insert_dataset(&dataset).await?;

    tracing::info!(
        dataset_id = %dataset.id,
        rows = dataset.row_count,
        columns = dataset.column_count,
        "Dataset uploaded"
    );

    Ok(UploadDatasetResponse { dataset })
}
