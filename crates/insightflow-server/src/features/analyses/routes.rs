//! Analysis API routes
//!
//! - `POST /api/v1/analyses` - Create an analysis (returns immediately in `pending`)
//! - `GET /api/v1/analyses` - List the caller's analyses with pagination and filters
//! - `GET /api/v1/analyses/:id` - Get one analysis (polling endpoint)
//! - `POST /api/v1/analyses/insights` - Generate narrative insights for a completed analysis

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::{
    commands::{
        CreateAnalysisCommand, CreateAnalysisError, GenerateInsightsCommand,
        GenerateInsightsError,
    },
    queries::{GetAnalysisError, GetAnalysisQuery, ListAnalysesError, ListAnalysesQuery},
};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;
use crate::identity::CurrentUser;
use crate::insights::InsightError;

pub fn analyses_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(create_analysis))
        .route("/", get(list_analyses))
        .route("/insights", post(generate_insights))
        .route("/:id", get(get_analysis))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Create an analysis
///
/// # Request Body
///
/// ```json
/// { "name": "Q1 sales", "type": "descriptive", "datasetId": "..." }
/// ```
///
/// # Response
///
/// - `201 Created` - `{"analysis": {...}}` in `pending` (or `failed` when it could not be queued)
/// - `400 Bad Request` - Missing field or unknown analysis type
/// - `404 Not Found` - Dataset absent or owned by someone else
/// - `500 Internal Server Error` - Persistence error
#[tracing::instrument(skip(state, body), fields(user_id = %user.id))]
async fn create_analysis(
    State(state): State<FeatureState>,
    user: CurrentUser,
    body: Result<Json<CreateAnalysisCommand>, JsonRejection>,
) -> Result<Response, AnalysisApiError> {
    let Json(command) = body?;

    let response = super::commands::create::handle(
        state.store.clone(),
        &state.queue,
        &state.events,
        &user.id,
        command,
    )
    .await?;

    tracing::info!(analysis_id = %response.analysis.id, "Analysis created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

/// Generate insights for a completed analysis
///
/// # Request Body
///
/// ```json
/// { "analysisId": "..." }
/// ```
///
/// # Response
///
/// - `200 OK` - `{"insights": "..."}`
/// - `400 Bad Request` - Missing id, analysis not completed or without results
/// - `404 Not Found` - Analysis absent or owned by someone else
/// - `500 Internal Server Error` - Generation failed (`QUOTA_EXCEEDED` / `UPSTREAM_ERROR`)
#[tracing::instrument(skip(state, body), fields(user_id = %user.id))]
async fn generate_insights(
    State(state): State<FeatureState>,
    user: CurrentUser,
    body: Result<Json<GenerateInsightsCommand>, JsonRejection>,
) -> Result<Response, AnalysisApiError> {
    let Json(command) = body?;

    let response = super::commands::generate_insights::handle(
        state.store.clone(),
        state.insights.as_ref(),
        &user.id,
        command,
    )
    .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

#[tracing::instrument(skip(state), fields(user_id = %user.id))]
async fn get_analysis(
    State(state): State<FeatureState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AnalysisApiError> {
    let response =
        super::queries::get::handle(state.store.clone(), &user.id, GetAnalysisQuery { id }).await?;

    tracing::debug!(
        analysis_id = %response.analysis.id,
        status = %response.analysis.status,
        "Analysis retrieved via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// List analyses
///
/// `GET /api/v1/analyses?page=1&per_page=20&dataset_id=...&status=completed`
#[tracing::instrument(skip(state, query), fields(user_id = %user.id))]
async fn list_analyses(
    State(state): State<FeatureState>,
    user: CurrentUser,
    query: Result<Query<ListAnalysesQuery>, QueryRejection>,
) -> Result<Response, AnalysisApiError> {
    let Query(query) = query?;
    let response = super::queries::list::handle(state.store.clone(), &user.id, query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Analyses listed via API"
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

/// Unified error type for analysis API endpoints
#[derive(Debug)]
enum AnalysisApiError {
    Body(JsonRejection),
    QueryString(QueryRejection),
    Create(CreateAnalysisError),
    Insights(GenerateInsightsError),
    Get(GetAnalysisError),
    List(ListAnalysesError),
}

impl From<JsonRejection> for AnalysisApiError {
    fn from(err: JsonRejection) -> Self {
        Self::Body(err)
    }
}

impl From<QueryRejection> for AnalysisApiError {
    fn from(err: QueryRejection) -> Self {
        Self::QueryString(err)
    }
}

impl From<CreateAnalysisError> for AnalysisApiError {
    fn from(err: CreateAnalysisError) -> Self {
        Self::Create(err)
    }
}

impl From<GenerateInsightsError> for AnalysisApiError {
    fn from(err: GenerateInsightsError) -> Self {
        Self::Insights(err)
    }
}

impl From<GetAnalysisError> for AnalysisApiError {
    fn from(err: GetAnalysisError) -> Self {
        Self::Get(err)
    }
}

impl From<ListAnalysesError> for AnalysisApiError {
    fn from(err: ListAnalysesError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for AnalysisApiError {
    fn into_response(self) -> Response {
        match self {
            AnalysisApiError::Body(_)
            | AnalysisApiError::QueryString(_)
            | AnalysisApiError::Create(CreateAnalysisError::MissingField(_))
            | AnalysisApiError::Create(CreateAnalysisError::NameValidation(_))
            | AnalysisApiError::Create(CreateAnalysisError::InvalidType(_))
            | AnalysisApiError::Insights(GenerateInsightsError::MissingField(_))
            | AnalysisApiError::List(ListAnalysesError::InvalidPagination(_))
            | AnalysisApiError::List(ListAnalysesError::InvalidDatasetId(_))
            | AnalysisApiError::List(ListAnalysesError::InvalidStatus(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },

            AnalysisApiError::Create(CreateAnalysisError::DatasetNotFound(_))
            | AnalysisApiError::Insights(GenerateInsightsError::NotFound(_))
            | AnalysisApiError::Get(GetAnalysisError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },

            AnalysisApiError::Insights(GenerateInsightsError::NotCompleted { .. })
            | AnalysisApiError::Insights(GenerateInsightsError::MissingResults(_)) => {
                let error = ErrorResponse::new("INVALID_STATE", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },

            AnalysisApiError::Insights(GenerateInsightsError::Upstream(
                InsightError::QuotaExceeded,
            )) => {
                let error = ErrorResponse::new(
                    "QUOTA_EXCEEDED",
                    "Insight generation quota exceeded, please try again later",
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
            AnalysisApiError::Insights(GenerateInsightsError::Upstream(ref e)) => {
                tracing::error!(error = %e, "Insight generation failed");
                let error = ErrorResponse::new("UPSTREAM_ERROR", "Insights could not be generated");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            AnalysisApiError::Create(CreateAnalysisError::Persistence(_))
            | AnalysisApiError::Insights(GenerateInsightsError::Persistence(_))
            | AnalysisApiError::Get(GetAnalysisError::Persistence(_))
            | AnalysisApiError::List(ListAnalysesError::Persistence(_)) => {
                tracing::error!("Persistence error in analysis API: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A persistence error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for AnalysisApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisApiError::Body(e) => write!(f, "Invalid request body: {}", e.body_text()),
            AnalysisApiError::QueryString(e) => {
                write!(f, "Invalid query string: {}", e.body_text())
            },
            AnalysisApiError::Create(e) => write!(f, "{}", e),
            AnalysisApiError::Insights(e) => write!(f, "{}", e),
            AnalysisApiError::Get(e) => write!(f, "{}", e),
            AnalysisApiError::List(e) => write!(f, "{}", e),
        }
    }
}
