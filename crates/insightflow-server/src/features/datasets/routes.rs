//! Dataset API routes
//!
//! - `POST /api/v1/datasets` - Upload a CSV or Excel file (multipart: `file`, `name`, `description`)
//! - `GET /api/v1/datasets` - List the caller's datasets with pagination
//! - `GET /api/v1/datasets/:id` - Get one dataset with columns and preview

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        rejection::QueryRejection,
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::{
    commands::{UploadDatasetCommand, UploadDatasetError, UploadedFile, MAX_UPLOAD_BYTES},
    queries::{GetDatasetError, GetDatasetQuery, ListDatasetsError, ListDatasetsQuery},
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;
use crate::identity::CurrentUser;

/// Room for multipart boundaries and the text fields on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn datasets_routes() -> Router<FeatureState> {
    Router::new()
        .route(
            "/",
            post(upload_dataset)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/", get(list_datasets))
        .route("/:id", get(get_dataset))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Upload a dataset
///
/// # Response
///
/// - `201 Created` - `{"dataset": {...}}` with inferred columns and up to 10 preview rows
/// - `400 Bad Request` - Missing name or file, unsupported format, unparsable or oversized file
/// - `500 Internal Server Error` - Persistence error
#[tracing::instrument(skip(state, multipart), fields(user_id = %user.id))]
async fn upload_dataset(
    State(state): State<FeatureState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Response, DatasetApiError> {
    let command = read_upload(multipart).await?;

    let response = super::commands::upload::handle(state.store.clone(), &user.id, command).await?;

    tracing::info!(dataset_id = %response.dataset.id, "Dataset uploaded via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// Collect the known multipart fields; unknown fields are skipped
async fn read_upload(mut multipart: Multipart) -> Result<UploadDatasetCommand, DatasetApiError> {
    let mut command = UploadDatasetCommand::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => command.file = Some(read_file(field).await?),
            Some("name") => command.name = Some(field.text().await?),
            Some("description") => command.description = Some(field.text().await?),
            _ => {},
        }
    }

    Ok(command)
}

async fn read_file(field: Field<'_>) -> Result<UploadedFile, MultipartError> {
    let file_name = field.file_name().unwrap_or("upload.csv").to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await?.to_vec();

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

#[tracing::instrument(skip(state), fields(user_id = %user.id))]
async fn get_dataset(
    State(state): State<FeatureState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, DatasetApiError> {
    let response =
        super::queries::get::handle(state.store.clone(), &user.id, GetDatasetQuery { id }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(state, query), fields(user_id = %user.id))]
async fn list_datasets(
    State(state): State<FeatureState>,
    user: CurrentUser,
    query: Result<Query<ListDatasetsQuery>, QueryRejection>,
) -> Result<Response, DatasetApiError> {
    let Query(query) = query?;
    let response = super::queries::list::handle(state.store.clone(), &user.id, query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Datasets listed via API"
    );

    let meta = json!({
        "pagination": response.pagination
    });

    Ok(
        (StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta)))
            .into_response(),
    )
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for dataset API endpoints
#[derive(Debug)]
enum DatasetApiError {
    Multipart(MultipartError),
    QueryString(QueryRejection),
    Upload(UploadDatasetError),
    Get(GetDatasetError),
    List(ListDatasetsError),
}

impl From<MultipartError> for DatasetApiError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart(err)
    }
}

impl From<QueryRejection> for DatasetApiError {
    fn from(err: QueryRejection) -> Self {
        Self::QueryString(err)
    }
}

impl From<UploadDatasetError> for DatasetApiError {
    fn from(err: UploadDatasetError) -> Self {
        Self::Upload(err)
    }
}

impl From<GetDatasetError> for DatasetApiError {
    fn from(err: GetDatasetError) -> Self {
        Self::Get(err)
    }
}

impl From<ListDatasetsError> for DatasetApiError {
    fn from(err: ListDatasetsError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for DatasetApiError {
    fn into_response(self) -> Response {
        match self {
            DatasetApiError::Multipart(ref e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                let error = ErrorResponse::new(
                    "VALIDATION_ERROR",
                    format!("File exceeds the {} byte upload limit", MAX_UPLOAD_BYTES),
                );
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            DatasetApiError::Multipart(_)
            | DatasetApiError::QueryString(_)
            | DatasetApiError::Upload(UploadDatasetError::MissingField(_))
            | DatasetApiError::Upload(UploadDatasetError::NameValidation(_))
            | DatasetApiError::Upload(UploadDatasetError::EmptyFile)
            | DatasetApiError::Upload(UploadDatasetError::FileTooLarge { .. })
            | DatasetApiError::Upload(UploadDatasetError::UnsupportedFormat(_))
            | DatasetApiError::Upload(UploadDatasetError::Unparsable(_))
            | DatasetApiError::List(ListDatasetsError::InvalidPagination(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },

            DatasetApiError::Get(GetDatasetError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },

            DatasetApiError::Upload(UploadDatasetError::Persistence(_))
            | DatasetApiError::Get(GetDatasetError::Persistence(_))
            | DatasetApiError::List(ListDatasetsError::Persistence(_)) => {
                tracing::error!("Persistence error in dataset API: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A persistence error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for DatasetApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetApiError::Multipart(e) => write!(f, "Invalid multipart body: {}", e.body_text()),
            DatasetApiError::QueryString(e) => {
                write!(f, "Invalid query string: {}", e.body_text())
            },
            DatasetApiError::Upload(e) => write!(f, "{}", e),
            DatasetApiError::Get(e) => write!(f, "{}", e),
            DatasetApiError::List(e) => write!(f, "{}", e),
        }
    }
}
