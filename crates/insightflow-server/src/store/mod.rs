//! Persistence layer
//!
//! Every feature talks to storage through the [`Store`] trait. Two backends exist:
//!
//! - [`MemoryStore`]: process-local maps, used for demo deployments and tests
//! - [`PgStore`]: PostgreSQL through `sqlx`, JSONB columns for the schemaless parts
//!
//! Ownership is enforced by the lookup predicates: a dataset or analysis is only ever returned
//! for the `(id, user_id)` pair that owns it. Status changes go through dedicated operations that
//! refuse to leave a terminal state, so the lifecycle rules hold whichever backend is selected.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Analysis, AnalysisResults, AnalysisStatus, ChartDescriptor, Dataset, DatasetSummary,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store shared between handlers and the analysis worker
pub type SharedStore = Arc<dyn Store>;

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Analysis '{0}' not found")]
    AnalysisNotFound(Uuid),

    #[error("Analysis '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: AnalysisStatus,
        to: AnalysisStatus,
    },

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Offset/limit window of a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }
}

/// One page of a list query plus the total number of matches
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Optional filters for listing analyses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisFilter {
    pub dataset_id: Option<Uuid>,
    pub status: Option<AnalysisStatus>,
}

impl AnalysisFilter {
    pub fn matches(&self, analysis: &Analysis) -> bool {
        self.dataset_id.is_none_or(|id| analysis.dataset_id == id)
            && self.status.is_none_or(|status| analysis.status == status)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Backend name reported by the health endpoint
    fn backend(&self) -> &'static str;

    /// Cheap connectivity check
    async fn ping(&self) -> Result<(), PersistenceError>;

    async fn insert_dataset(&self, dataset: &Dataset) -> Result<(), PersistenceError>;

    async fn find_dataset(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Dataset>, PersistenceError>;

    /// The user's datasets, newest first
    async fn list_datasets(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<DatasetSummary>, PersistenceError>;

    async fn insert_analysis(&self, analysis: &Analysis) -> Result<(), PersistenceError>;

    async fn find_analysis(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Analysis>, PersistenceError>;

    /// The user's analyses matching `filter`, newest first
    async fn list_analyses(
        &self,
        user_id: &str,
        filter: &AnalysisFilter,
        page: PageRequest,
    ) -> Result<Page<Analysis>, PersistenceError>;

    /// `pending -> processing`
    async fn mark_processing(&self, id: Uuid) -> Result<Analysis, PersistenceError>;

    /// Move to `completed`, writing status, results and visualizations in one update
    async fn complete_analysis(
        &self,
        id: Uuid,
        results: &AnalysisResults,
        visualizations: &[ChartDescriptor],
    ) -> Result<Analysis, PersistenceError>;

    /// Move to `failed`, clearing results and visualizations
    async fn fail_analysis(&self, id: Uuid) -> Result<Analysis, PersistenceError>;

    /// Overwrite the insights of a `completed` analysis
    async fn set_insights(&self, id: Uuid, insights: &str) -> Result<Analysis, PersistenceError>;
}
