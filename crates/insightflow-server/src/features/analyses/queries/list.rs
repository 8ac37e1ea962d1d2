use serde::{Deserialize, Serialize};

use crate::features::shared::pagination::{Paginated, PaginationParams};
use crate::features::shared::validation::parse_id;
use crate::models::{Analysis, AnalysisStatus};
use crate::store::{AnalysisFilter, PersistenceError, SharedStore};

/// Query string of `GET /api/v1/analyses`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAnalysesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

pub type ListAnalysesResponse = Paginated<Analysis>;

#[derive(Debug, thiserror::Error)]
pub enum ListAnalysesError {
    #[error("{0}")]
    InvalidPagination(&'static str),

    #[error("Invalid dataset id filter: {0}")]
    InvalidDatasetId(String),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl ListAnalysesQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }

    pub fn validate(&self) -> Result<AnalysisFilter, ListAnalysesError> {
        self.pagination()
            .validate()
            .map_err(ListAnalysesError::InvalidPagination)?;

        let dataset_id = self
            .dataset_id
            .as_deref()
            .map(|raw| parse_id(raw).ok_or_else(|| ListAnalysesError::InvalidDatasetId(raw.to_string())))
            .transpose()?;

        let status = self
            .status
            .as_deref()
            .map(|raw| raw.parse::<AnalysisStatus>().map_err(ListAnalysesError::InvalidStatus))
            .transpose()?;

        Ok(AnalysisFilter { dataset_id, status })
    }
}

/// The caller's analyses, newest first
#[tracing::instrument(skip(store), fields(user_id = %user_id))]
pub async fn handle(
    store: SharedStore,
    user_id: &str,
    query: ListAnalysesQuery,
) -> Result<ListAnalysesResponse, ListAnalysesError> {
    let filter = query.validate()?;
    let params = query.pagination();

    let page = store
        .list_analyses(user_id, &filter, params.page_request())
        .await?;

    Ok(Paginated::from_page(page, &params))
}
