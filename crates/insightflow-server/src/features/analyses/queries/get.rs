use serde::{Deserialize, Serialize};

use crate::features::shared::validation::parse_id;
use crate::models::Analysis;
use crate::store::{PersistenceError, SharedStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAnalysisQuery {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAnalysisResponse {
    pub analysis: Analysis,
}

#[derive(Debug, thiserror::Error)]
pub enum GetAnalysisError {
    #[error("Analysis '{0}' not found")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Fetch one of the caller's analyses; used by clients polling for completion
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn handle(
    store: SharedStore,
    user_id: &str,
    query: GetAnalysisQuery,
) -> Result<GetAnalysisResponse, GetAnalysisError> {
    let id = parse_id(&query.id).ok_or_else(|| GetAnalysisError::NotFound(query.id.clone()))?;

    let analysis = store
        .find_analysis(id, user_id)
        .await?
        .ok_or_else(|| GetAnalysisError::NotFound(query.id.clone()))?;

    Ok(GetAnalysisResponse { analysis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestDataset, TEST_USER};
    use crate::models::{AnalysisStatus, AnalysisType};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_own_analysis_only() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let dataset = TestDataset::sales().build();
        store.insert_dataset(&dataset).await.unwrap();
        let analysis = Analysis::pending(TEST_USER, dataset.id, "Q1", AnalysisType::Correlation);
        store.insert_analysis(&analysis).await.unwrap();

        let query = GetAnalysisQuery {
            id: analysis.id.to_string(),
        };
        let found = handle(store.clone(), TEST_USER, query.clone()).await.unwrap();
        assert_eq!(found.analysis.status, AnalysisStatus::Pending);

        assert!(matches!(
            handle(store.clone(), "someone-else", query).await,
            Err(GetAnalysisError::NotFound(_))
        ));
        assert!(matches!(
            handle(store, TEST_USER, GetAnalysisQuery { id: "abc".to_string() }).await,
            Err(GetAnalysisError::NotFound(_))
        ));
    }
}
