//! Create analysis command
//!
//! Persists a `pending` analysis over one of the caller's datasets and hands it to the job queue.
//! The response never waits for processing; clients poll the analysis (or listen for its
//! [`AnalysisEvent`]) to observe the terminal state.

use serde::{Deserialize, Serialize};

use crate::features::shared::validation::{
    parse_id, require_field, validate_name, MissingFieldError, NameValidationError,
    MAX_NAME_LENGTH,
};
use crate::jobs::{AnalysisEvent, AnalysisEvents, AnalysisJob, AnalysisQueue};
use crate::models::{Analysis, AnalysisType};
use crate::store::{PersistenceError, SharedStore};

/// Request body of `POST /api/v1/analyses`
///
/// Fields are optional at the wire level so that a missing field is reported as a validation
/// error rather than a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisCommand {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "type")]
    pub analysis_type: Option<String>,

    #[serde(default)]
    pub dataset_id: Option<String>,
}

/// Validated form of [`CreateAnalysisCommand`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnalysis {
    pub name: String,
    pub analysis_type: AnalysisType,
    pub dataset_ref: String,
}

/// `{"analysis": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnalysisResponse {
    pub analysis: Analysis,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateAnalysisError {
    #[error("{0}")]
    MissingField(#[from] MissingFieldError),

    #[error("Name validation failed: {0}")]
    NameValidation(#[from] NameValidationError),

    #[error("{0}")]
    InvalidType(String),

    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl CreateAnalysisCommand {
    /// Check required fields, the name and the analysis type
    pub fn validate(&self) -> Result<NewAnalysis, CreateAnalysisError> {
        let name = require_field(self.name.as_deref(), "name")?;
        let analysis_type = require_field(self.analysis_type.as_deref(), "type")?;
        let dataset_ref = require_field(self.dataset_id.as_deref(), "datasetId")?;

        validate_name(name, MAX_NAME_LENGTH)?;
        let analysis_type = analysis_type
            .parse::<AnalysisType>()
            .map_err(CreateAnalysisError::InvalidType)?;

        Ok(NewAnalysis {
            name: name.to_string(),
            analysis_type,
            dataset_ref: dataset_ref.to_string(),
        })
    }
}

/// Create an analysis and queue it for processing
///
/// Exactly one analysis is persisted per successful call. When the queue refuses the job the
/// analysis is moved straight to `failed` so that it cannot stay `pending` forever; it is still
/// returned to the caller.
#[tracing::instrument(skip(store, queue, events, command), fields(user_id = %user_id))]
pub async fn handle(
    store: SharedStore,
    queue: &AnalysisQueue,
    events: &AnalysisEvents,
    user_id: &str,
    command: CreateAnalysisCommand,
) -> Result<CreateAnalysisResponse, CreateAnalysisError> {
    let new = command.validate()?;

    let dataset_id = parse_id(&new.dataset_ref)
        .ok_or_else(|| CreateAnalysisError::DatasetNotFound(new.dataset_ref.clone()))?;
    let dataset = store
        .find_dataset(dataset_id, user_id)
        .await?
        .ok_or_else(|| CreateAnalysisError::DatasetNotFound(new.dataset_ref.clone()))?;

    let analysis = Analysis::pending(user_id, dataset.id, new.name, new.analysis_type);
    store.insert_analysis(&analysis).await?;

    tracing::info!(
        analysis_id = %analysis.id,
        dataset_id = %dataset.id,
        analysis_type = %analysis.analysis_type,
        "Analysis created"
    );

    if let Err(e) = queue.submit(AnalysisJob::new(analysis.id, dataset)) {
        tracing::error!(analysis_id = %analysis.id, error = %e, "Could not queue analysis");

        let failed = store.fail_analysis(analysis.id).await?;
        events.publish(AnalysisEvent {
            analysis_id: failed.id,
            status: failed.status,
        });
        return Ok(CreateAnalysisResponse { analysis: failed });
    }

    Ok(CreateAnalysisResponse { analysis })
}
