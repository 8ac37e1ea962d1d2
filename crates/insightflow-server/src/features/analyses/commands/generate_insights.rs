//! Generate insights command
//!
//! Asks the text-generation backend for a narrative over the statistics of a completed analysis
//! and stores the text on the analysis, overwriting any earlier insights. The analysis status and
//! results are never touched: an upstream failure is returned to the caller and leaves the
//! analysis exactly as it was.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::shared::validation::{parse_id, require_field, MissingFieldError};
use crate::insights::{InsightError, InsightGenerator, InsightRequest};
use crate::models::AnalysisStatus;
use crate::store::{PersistenceError, SharedStore};

/// Request body of `POST /api/v1/analyses/insights`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInsightsCommand {
    #[serde(default)]
    pub analysis_id: Option<String>,
}

/// `{"insights": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateInsightsResponse {
    pub insights: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateInsightsError {
    #[error("{0}")]
    MissingField(#[from] MissingFieldError),

    #[error("Analysis '{0}' not found")]
    NotFound(String),

    #[error("Analysis '{id}' is {status}, insights need a completed analysis")]
    NotCompleted { id: Uuid, status: AnalysisStatus },

    #[error("Analysis '{0}' has no results")]
    MissingResults(Uuid),

    #[error("Insight generation failed: {0}")]
    Upstream(#[from] InsightError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl GenerateInsightsCommand {
    pub fn validate(&self) -> Result<&str, GenerateInsightsError> {
        Ok(require_field(self.analysis_id.as_deref(), "analysisId")?)
    }
}

/// Generate and store insights for one of the caller's completed analyses
#[tracing::instrument(skip(store, generator, command), fields(user_id = %user_id))]
pub async fn handle(
    store: SharedStore,
    generator: &dyn InsightGenerator,
    user_id: &str,
    command: GenerateInsightsCommand,
) -> Result<GenerateInsightsResponse, GenerateInsightsError> {
    let analysis_ref = command.validate()?;

    let not_found = || GenerateInsightsError::NotFound(analysis_ref.to_string());
    let analysis_id = parse_id(analysis_ref).ok_or_else(not_found)?;
    let analysis = store
        .find_analysis(analysis_id, user_id)
        .await?
        .ok_or_else(not_found)?;

    if analysis.status != AnalysisStatus::Completed {
        return Err(GenerateInsightsError::NotCompleted {
            id: analysis.id,
            status: analysis.status,
        });
    }
    let results = analysis
        .results
        .ok_or(GenerateInsightsError::MissingResults(analysis.id))?;

    let dataset = store
        .find_dataset(analysis.dataset_id, user_id)
        .await?
        .ok_or_else(not_found)?;

    // A stored count of zero means the count was never recorded.
    let known = |count: i64| (count > 0).then_some(count);
    let request = InsightRequest {
        dataset_name: dataset.name,
        analysis_type: analysis.analysis_type,
        results,
        row_count: known(dataset.row_count),
        column_count: known(dataset.column_count),
    };

    let insights = generator.generate(&request).await?;
    store.set_insights(analysis.id, &insights).await?;

    tracing::info!(analysis_id = %analysis.id, "Insights stored");

    Ok(GenerateInsightsResponse { insights })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{
        FakeInsightGenerator, FakeOutcome, TestDataset, TEST_USER,
    };
    use crate::models::{Analysis, AnalysisResults, AnalysisType};
    use crate::store::MemoryStore;
    use insightflow_common::ColumnMeta;
    use std::sync::Arc;

    struct Fixture {
        store: SharedStore,
        analysis: Analysis,
    }

    async fn fixture(dataset: TestDataset, complete: bool) -> Fixture {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let dataset = dataset.build();
        store.insert_dataset(&dataset).await.unwrap();

        let analysis = Analysis::pending(TEST_USER, dataset.id, "Q1", AnalysisType::Descriptive);
        store.insert_analysis(&analysis).await.unwrap();

        let analysis = if complete {
            store.mark_processing(analysis.id).await.unwrap();
            let output = crate::engine::run(&dataset.columns, &dataset.preview);
            store
                .complete_analysis(analysis.id, &output.results, &output.visualizations)
                .await
                .unwrap()
        } else {
            analysis
        };

        Fixture { store, analysis }
    }

    fn command(id: &str) -> GenerateInsightsCommand {
        GenerateInsightsCommand {
            analysis_id: Some(id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_generates_and_stores_insights() {
        let f = fixture(TestDataset::sales().with_name("Q1 Satışlar"), true).await;
        let generator = FakeInsightGenerator::replying("Satışlar artıyor.");

        let response = handle(f.store.clone(), &generator, TEST_USER, command(&f.analysis.id.to_string()))
            .await
            .unwrap();
        assert_eq!(response.insights, "Satışlar artıyor.");

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].dataset_name, "Q1 Satışlar");
        assert_eq!(requests[0].row_count, Some(3));
        assert_eq!(requests[0].column_count, Some(4));
        assert_eq!(requests[0].results, f.analysis.results.clone().unwrap());

        let stored = f.store.find_analysis(f.analysis.id, TEST_USER).await.unwrap().unwrap();
        assert_eq!(stored.insights.as_deref(), Some("Satışlar artıyor."));
        assert_eq!(stored.status, AnalysisStatus::Completed);
        assert_eq!(stored.results, f.analysis.results);
    }

    #[tokio::test]
    async fn test_repeated_calls_overwrite() {
        let f = fixture(TestDataset::sales(), true).await;
        let id = f.analysis.id.to_string();

        handle(f.store.clone(), &FakeInsightGenerator::replying("first"), TEST_USER, command(&id))
            .await
            .unwrap();
        handle(f.store.clone(), &FakeInsightGenerator::replying("second"), TEST_USER, command(&id))
            .await
            .unwrap();

        let stored = f.store.find_analysis(f.analysis.id, TEST_USER).await.unwrap().unwrap();
        assert_eq!(stored.insights.as_deref(), Some("second"));
        assert_eq!(stored.results, f.analysis.results);
    }

    #[tokio::test]
    async fn test_zero_counts_are_unknown() {
        let f = fixture(
            TestDataset::sales()
                .with_sample(vec![ColumnMeta::number("Satış")], vec![])
                .with_row_count(0),
            true,
        )
        .await;
        let generator = FakeInsightGenerator::replying("ok");

        handle(f.store.clone(), &generator, TEST_USER, command(&f.analysis.id.to_string()))
            .await
            .unwrap();

        let request = &generator.requests()[0];
        assert_eq!(request.row_count, None);
        assert_eq!(request.column_count, Some(1));
        assert_eq!(request.results, AnalysisResults::new());
    }

    #[tokio::test]
    async fn test_preconditions() {
        let pending = fixture(TestDataset::sales(), false).await;
        let generator = FakeInsightGenerator::replying("unused");

        let err = handle(pending.store.clone(), &generator, TEST_USER, GenerateInsightsCommand::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateInsightsError::MissingField(_)));

        let err = handle(pending.store.clone(), &generator, TEST_USER, command("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateInsightsError::NotFound(_)));

        let id = pending.analysis.id.to_string();
        let err = handle(pending.store.clone(), &generator, "someone-else", command(&id))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateInsightsError::NotFound(_)));

        let err = handle(pending.store.clone(), &generator, TEST_USER, command(&id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateInsightsError::NotCompleted { status: AnalysisStatus::Pending, .. }
        ));

        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_leaves_analysis_untouched() {
        let f = fixture(TestDataset::sales(), true).await;

        for outcome in [FakeOutcome::QuotaExceeded, FakeOutcome::Unavailable] {
            let generator = FakeInsightGenerator::new(outcome);
            let err = handle(f.store.clone(), &generator, TEST_USER, command(&f.analysis.id.to_string()))
                .await
                .unwrap_err();
            assert!(matches!(err, GenerateInsightsError::Upstream(_)));
        }

        let stored = f.store.find_analysis(f.analysis.id, TEST_USER).await.unwrap().unwrap();
        assert_eq!(stored, f.analysis);
    }
}
