use serde::{Deserialize, Serialize};

use crate::features::shared::validation::parse_id;
use crate::models::Dataset;
use crate::store::{PersistenceError, SharedStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDatasetQuery {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetDatasetResponse {
    pub dataset: Dataset,
}

#[derive(Debug, thiserror::Error)]
pub enum GetDatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Full dataset, columns and preview included
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn handle(
    store: SharedStore,
    user_id: &str,
    query: GetDatasetQuery,
) -> Result<GetDatasetResponse, GetDatasetError> {
    let not_found = || GetDatasetError::NotFound(query.id.clone());

    let id = parse_id(&query.id).ok_or_else(not_found)?;
    let dataset = store.find_dataset(id, user_id).await?.ok_or_else(not_found)?;

    Ok(GetDatasetResponse { dataset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestDataset, TEST_USER};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_dataset() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let dataset = TestDataset::sales().build();
        store.insert_dataset(&dataset).await.unwrap();

        let query = GetDatasetQuery {
            id: dataset.id.to_string(),
        };
        let found = handle(store.clone(), TEST_USER, query.clone()).await.unwrap();
        assert_eq!(found.dataset, dataset);

        assert!(matches!(
            handle(store, "intruder", query).await,
            Err(GetDatasetError::NotFound(_))
        ));
    }
}
