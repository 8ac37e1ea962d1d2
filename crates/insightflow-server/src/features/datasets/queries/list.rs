use serde::{Deserialize, Serialize};

use crate::features::shared::pagination::{Paginated, PaginationParams};
use crate::models::DatasetSummary;
use crate::store::{PersistenceError, SharedStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListDatasetsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

pub type ListDatasetsResponse = Paginated<DatasetSummary>;

#[derive(Debug, thiserror::Error)]
pub enum ListDatasetsError {
    #[error("{0}")]
    InvalidPagination(&'static str),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// The caller's datasets, newest first, summary fields only
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn handle(
    store: SharedStore,
    user_id: &str,
    query: ListDatasetsQuery,
) -> Result<ListDatasetsResponse, ListDatasetsError> {
    let params = PaginationParams::new(query.page, query.per_page);
    params.validate().map_err(ListDatasetsError::InvalidPagination)?;

    let page = store.list_datasets(user_id, params.page_request()).await?;

    Ok(Paginated::from_page(page, &params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{TestDataset, TEST_USER};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_datasets() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        for name in ["a", "b", "c"] {
            store
                .insert_dataset(&TestDataset::sales().with_name(name).build())
                .await
                .unwrap();
        }

        let query = ListDatasetsQuery {
            page: Some(2),
            per_page: Some(2),
        };
        let response = handle(store.clone(), TEST_USER, query).await.unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.pagination.total, 3);
        assert!(response.pagination.has_prev);

        let invalid = ListDatasetsQuery {
            page: None,
            per_page: Some(0),
        };
        assert!(matches!(
            handle(store, TEST_USER, invalid).await,
            Err(ListDatasetsError::InvalidPagination(_))
        ));
    }
}
