//! In-memory store
//!
//! Selected with `STORE_BACKEND=memory`. Data lives as long as the process.

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AnalysisFilter, Page, PageRequest, PersistenceError, Store};
use crate::models::{
    Analysis, AnalysisResults, AnalysisStatus, ChartDescriptor, Dataset, DatasetSummary,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: RwLock<IndexMap<Uuid, Dataset>>,
    analyses: RwLock<IndexMap<Uuid, Analysis>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status change under the write lock, refusing transitions the lifecycle forbids
    async fn transition<F>(
        &self,
        id: Uuid,
        to: AnalysisStatus,
        apply: F,
    ) -> Result<Analysis, PersistenceError>
    where
        F: FnOnce(&mut Analysis) + Send,
    {
        let mut analyses = self.analyses.write().await;
        let analysis = analyses
            .get_mut(&id)
            .ok_or(PersistenceError::AnalysisNotFound(id))?;

        if !analysis.status.can_transition_to(to) {
            return Err(PersistenceError::InvalidTransition {
                id,
                from: analysis.status,
                to,
            });
        }

        analysis.status = to;
        apply(analysis);
        analysis.updated_at = Utc::now();

        Ok(analysis.clone())
    }
}

/// Newest first; among equal timestamps the later insert wins
fn newest_first<'a, T: 'a>(
    items: impl DoubleEndedIterator<Item = &'a T>,
    created_at: impl Fn(&T) -> chrono::DateTime<Utc>,
) -> Vec<&'a T> {
    let mut sorted: Vec<&T> = items.rev().collect();
    sorted.sort_by_key(|item| std::cmp::Reverse(created_at(*item)));
    sorted
}

fn window<T: Clone>(items: &[&T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .map(|item| (*item).clone())
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn insert_dataset(&self, dataset: &Dataset) -> Result<(), PersistenceError> {
        self.datasets.write().await.insert(dataset.id, dataset.clone());
        Ok(())
    }

    async fn find_dataset(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Dataset>, PersistenceError> {
        let datasets = self.datasets.read().await;
        Ok(datasets.get(&id).filter(|d| d.user_id == user_id).cloned())
    }

    async fn list_datasets(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<DatasetSummary>, PersistenceError> {
        let datasets = self.datasets.read().await;
        let owned = newest_first(datasets.values().filter(|d| d.user_id == user_id), |d| {
            d.created_at
        });

        Ok(Page {
            total: owned.len() as i64,
            items: window(&owned, page).iter().map(Dataset::summary).collect(),
        })
    }

    async fn insert_analysis(&self, analysis: &Analysis) -> Result<(), PersistenceError> {
        self.analyses.write().await.insert(analysis.id, analysis.clone());
        Ok(())
    }

    async fn find_analysis(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Analysis>, PersistenceError> {
        let analyses = self.analyses.read().await;
        Ok(analyses.get(&id).filter(|a| a.user_id == user_id).cloned())
    }

    async fn list_analyses(
        &self,
        user_id: &str,
        filter: &AnalysisFilter,
        page: PageRequest,
    ) -> Result<Page<Analysis>, PersistenceError> {
        let analyses = self.analyses.read().await;
        let matching = newest_first(
            analyses
                .values()
                .filter(|a| a.user_id == user_id && filter.matches(a)),
            |a| a.created_at,
        );

        Ok(Page {
            total: matching.len() as i64,
            items: window(&matching, page),
        })
    }

    async fn mark_processing(&self, id: Uuid) -> Result<Analysis, PersistenceError> {
        self.transition(id, AnalysisStatus::Processing, |_| {}).await
    }

    async fn complete_analysis(
        &self,
        id: Uuid,
        results: &AnalysisResults,
        visualizations: &[ChartDescriptor],
    ) -> Result<Analysis, PersistenceError> {
        let results = results.clone();
        let visualizations = visualizations.to_vec();

        self.transition(id, AnalysisStatus::Completed, move |analysis| {
            analysis.results = Some(results);
            analysis.visualizations = Some(visualizations);
        })
        .await
    }

    async fn fail_analysis(&self, id: Uuid) -> Result<Analysis, PersistenceError> {
        self.transition(id, AnalysisStatus::Failed, |analysis| {
            analysis.results = None;
            analysis.visualizations = None;
        })
        .await
    }

    async fn set_insights(&self, id: Uuid, insights: &str) -> Result<Analysis, PersistenceError> {
        let mut analyses = self.analyses.write().await;
        let analysis = analyses
            .get_mut(&id)
            .ok_or(PersistenceError::AnalysisNotFound(id))?;

        if analysis.status != AnalysisStatus::Completed {
            return Err(PersistenceError::InvalidTransition {
                id,
                from: analysis.status,
                to: AnalysisStatus::Completed,
            });
        }

        analysis.insights = Some(insights.to_string());
        analysis.updated_at = Utc::now();

        Ok(analysis.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::TestDataset;
    use crate::models::AnalysisType;
    use chrono::Duration;

    async fn store_with_pending() -> (MemoryStore, Analysis) {
        let store = MemoryStore::new();
        let dataset = TestDataset::sales().build();
        store.insert_dataset(&dataset).await.unwrap();

        let analysis =
            Analysis::pending(&dataset.user_id, dataset.id, "Q1", AnalysisType::Descriptive);
        store.insert_analysis(&analysis).await.unwrap();
        (store, analysis)
    }

    #[tokio::test]
    async fn test_lookup_requires_owner() {
        let (store, analysis) = store_with_pending().await;

        assert!(store.find_analysis(analysis.id, "demo-user-id").await.unwrap().is_some());
        assert!(store.find_analysis(analysis.id, "someone-else").await.unwrap().is_none());
        assert!(store
            .find_dataset(analysis.dataset_id, "someone-else")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (store, analysis) = store_with_pending().await;

        let processing = store.mark_processing(analysis.id).await.unwrap();
        assert_eq!(processing.status, AnalysisStatus::Processing);

        let completed = store
            .complete_analysis(analysis.id, &AnalysisResults::new(), &[])
            .await
            .unwrap();
        assert_eq!(completed.status, AnalysisStatus::Completed);
        assert_eq!(completed.results, Some(AnalysisResults::new()));

        let with_insights = store.set_insights(analysis.id, "Satışlar artıyor").await.unwrap();
        assert_eq!(with_insights.insights.as_deref(), Some("Satışlar artıyor"));
        assert_eq!(with_insights.status, AnalysisStatus::Completed);
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let (store, analysis) = store_with_pending().await;
        store.fail_analysis(analysis.id).await.unwrap();

        let err = store
            .complete_analysis(analysis.id, &AnalysisResults::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::InvalidTransition {
                from: AnalysisStatus::Failed,
                to: AnalysisStatus::Completed,
                ..
            }
        ));
        assert!(store.mark_processing(analysis.id).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_clears_results() {
        let (store, analysis) = store_with_pending().await;
        let failed = store.fail_analysis(analysis.id).await.unwrap();

        assert_eq!(failed.status, AnalysisStatus::Failed);
        assert!(failed.results.is_none());
        assert!(failed.visualizations.is_none());
    }

    #[tokio::test]
    async fn test_insights_need_completed_analysis() {
        let (store, analysis) = store_with_pending().await;
        assert!(matches!(
            store.set_insights(analysis.id, "text").await,
            Err(PersistenceError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_analysis() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.mark_processing(id).await,
            Err(PersistenceError::AnalysisNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_list_datasets_newest_first_and_paginated() {
        let store = MemoryStore::new();
        let base = Utc::now();

        for (i, name) in ["first", "second", "third"].iter().enumerate() {
            let mut dataset = TestDataset::sales().with_name(name).build();
            dataset.created_at = base + Duration::seconds(i as i64);
            store.insert_dataset(&dataset).await.unwrap();
        }
        store
            .insert_dataset(&TestDataset::sales().with_user("other").build())
            .await
            .unwrap();

        let page = store
            .list_datasets("demo-user-id", PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["third", "second"]);

        let rest = store
            .list_datasets("demo-user-id", PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.items[0].name, "first");
    }

    #[tokio::test]
    async fn test_list_analyses_filters() {
        let (store, pending) = store_with_pending().await;
        let other =
            Analysis::pending("demo-user-id", Uuid::new_v4(), "Q2", AnalysisType::Regression);
        store.insert_analysis(&other).await.unwrap();
        store.fail_analysis(other.id).await.unwrap();

        let by_dataset = AnalysisFilter {
            dataset_id: Some(pending.dataset_id),
            status: None,
        };
        let page = store
            .list_analyses("demo-user-id", &by_dataset, PageRequest::new(0, 20))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, pending.id);

        let failed = AnalysisFilter {
            dataset_id: None,
            status: Some(AnalysisStatus::Failed),
        };
        let page = store
            .list_analyses("demo-user-id", &failed, PageRequest::new(0, 20))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, other.id);
    }
}
