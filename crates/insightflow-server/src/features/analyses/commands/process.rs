//! Process analysis command
//!
//! Runs once per queued job: `pending -> processing`, then the statistics engine over the dataset
//! preview, then `completed` with results and visualizations written in a single store call.
//! Anything going wrong on the way (a dataset breaking the sample invariants, a panic in the
//! computation, statistics overflowing to infinity, a store error) ends in `failed` instead. The caller that created the analysis has
//! long returned, so failures are logged and published as events rather than surfaced.

use insightflow_common::{ColumnMeta, Row};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info};

use crate::engine::{self, EngineOutput};
use crate::jobs::{AnalysisEvent, AnalysisEvents, AnalysisJob};
use crate::models::{Analysis, DatasetInvariantError};
use crate::store::{PersistenceError, SharedStore};

#[derive(Debug, thiserror::Error)]
pub enum ProcessAnalysisError {
    #[error("Dataset sample is invalid: {0}")]
    InvalidDataset(#[from] DatasetInvariantError),

    #[error("Computation panicked: {0}")]
    ComputationPanicked(String),

    #[error("Statistics for column '{0}' are not finite numbers")]
    NonFiniteStatistics(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Process one job with the statistics engine
#[tracing::instrument(skip_all, fields(analysis_id = %job.analysis_id, dataset_id = %job.dataset.id))]
pub async fn handle(
    store: SharedStore,
    events: &AnalysisEvents,
    job: AnalysisJob,
) -> Result<Analysis, ProcessAnalysisError> {
    process_with(store, events, job, engine::run).await
}

/// Process one job with the given computation
pub(crate) async fn process_with<F>(
    store: SharedStore,
    events: &AnalysisEvents,
    job: AnalysisJob,
    compute: F,
) -> Result<Analysis, ProcessAnalysisError>
where
    F: FnOnce(&[ColumnMeta], &[Row]) -> EngineOutput,
{
    let analysis_id = job.analysis_id;
    let queued_for = chrono::Utc::now() - job.submitted_at;

    match run(&store, job, compute).await {
        Ok(analysis) => {
            info!(
                statistics = analysis.results.as_ref().map_or(0, |r| r.len()),
                charts = analysis.visualizations.as_ref().map_or(0, |v| v.len()),
                queued_ms = queued_for.num_milliseconds(),
                "Analysis completed"
            );
            events.publish(AnalysisEvent {
                analysis_id,
                status: analysis.status,
            });
            Ok(analysis)
        },
        Err(e) => {
            error!(analysis_id = %analysis_id, error = %e, "Analysis processing failed");

            match store.fail_analysis(analysis_id).await {
                Ok(failed) => events.publish(AnalysisEvent {
                    analysis_id,
                    status: failed.status,
                }),
                Err(fail_err) => {
                    error!(analysis_id = %analysis_id, error = %fail_err, "Could not mark analysis as failed")
                },
            }

            Err(e)
        },
    }
}

async fn run<F>(
    store: &SharedStore,
    job: AnalysisJob,
    compute: F,
) -> Result<Analysis, ProcessAnalysisError>
where
    F: FnOnce(&[ColumnMeta], &[Row]) -> EngineOutput,
{
    store.mark_processing(job.analysis_id).await?;
    job.dataset.check_invariants()?;

    let dataset = &job.dataset;
    let output = panic::catch_unwind(AssertUnwindSafe(|| {
        compute(&dataset.columns, &dataset.preview)
    }))
    .map_err(|payload| ProcessAnalysisError::ComputationPanicked(panic_message(payload.as_ref())))?;

    if let Some(column) = output.non_finite_column() {
        return Err(ProcessAnalysisError::NonFiniteStatistics(column.to_string()));
    }

    let analysis = store
        .complete_analysis(job.analysis_id, &output.results, &output.visualizations)
        .await?;

    Ok(analysis)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
