//! PostgreSQL store
//!
//! Columns, preview rows, results and visualizations are stored as JSONB. Status changes are
//! single conditional `UPDATE`s, so a concurrent writer can never move an analysis out of a
//! terminal state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insightflow_common::{ColumnMeta, Row};
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    types::Json,
    FromRow,
};
use std::time::Duration;
use uuid::Uuid;

use super::{AnalysisFilter, Page, PageRequest, PersistenceError, Store};
use crate::config::DatabaseConfig;
use crate::models::{
    Analysis, AnalysisResults, AnalysisStatus, ChartDescriptor, Dataset, DatasetSummary,
};

const ANALYSIS_COLUMNS: &str = "id, user_id, dataset_id, name, analysis_type, status, results, \
                                visualizations, insights, created_at, updated_at";

const DATASET_COLUMNS: &str = "id, user_id, name, description, file_name, file_type, file_size, \
                               row_count, column_count, columns, preview, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool and apply pending migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database connection pool created"
        );

        sqlx::migrate!("../../migrations").run(&pool).await?;
        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn transition(
        &self,
        id: Uuid,
        to: AnalysisStatus,
        results: Option<&AnalysisResults>,
        visualizations: Option<&[ChartDescriptor]>,
    ) -> Result<Analysis, PersistenceError> {
        let sources: Vec<String> = allowed_sources(to)
            .into_iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let sql = format!(
            "UPDATE analyses \
             SET status = $2, results = $3, visualizations = $4, updated_at = NOW() \
             WHERE id = $1 AND status = ANY($5) \
             RETURNING {ANALYSIS_COLUMNS}"
        );

        let record = sqlx::query_as::<_, AnalysisRecord>(&sql)
            .bind(id)
            .bind(to.as_str())
            .bind(results.map(Json))
            .bind(visualizations.map(Json))
            .bind(sources)
            .fetch_optional(&self.pool)
            .await?;

        match record {
            Some(record) => record.try_into(),
            None => Err(self.rejection(id, to).await),
        }
    }

    /// Explain why a conditional update touched no row
    async fn rejection(&self, id: Uuid, to: AnalysisStatus) -> PersistenceError {
        let current: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM analyses WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;

        match current {
            Ok(Some(status)) => match status.parse() {
                Ok(from) => PersistenceError::InvalidTransition { id, from, to },
                Err(e) => PersistenceError::Corrupt(e),
            },
            Ok(None) => PersistenceError::AnalysisNotFound(id),
            Err(e) => PersistenceError::Database(e),
        }
    }
}

/// States from which `to` may be reached
fn allowed_sources(to: AnalysisStatus) -> Vec<AnalysisStatus> {
    [
        AnalysisStatus::Pending,
        AnalysisStatus::Processing,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ]
    .into_iter()
    .filter(|from| from.can_transition_to(to))
    .collect()
}

#[derive(Debug, FromRow)]
struct DatasetRecord {
    id: Uuid,
    user_id: String,
    name: String,
    description: Option<String>,
    file_name: String,
    file_type: String,
    file_size: i64,
    row_count: i64,
    column_count: i64,
    columns: Json<Vec<ColumnMeta>>,
    preview: Json<Vec<Row>>,
    created_at: DateTime<Utc>,
}

impl From<DatasetRecord> for Dataset {
    fn from(record: DatasetRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            description: record.description,
            file_name: record.file_name,
            file_type: record.file_type,
            file_size: record.file_size,
            row_count: record.row_count,
            column_count: record.column_count,
            columns: record.columns.0,
            preview: record.preview.0,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DatasetSummaryRecord {
    id: Uuid,
    name: String,
    row_count: i64,
    column_count: i64,
    created_at: DateTime<Utc>,
}

impl From<DatasetSummaryRecord> for DatasetSummary {
    fn from(record: DatasetSummaryRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            row_count: record.row_count,
            column_count: record.column_count,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AnalysisRecord {
    id: Uuid,
    user_id: String,
    dataset_id: Uuid,
    name: String,
    analysis_type: String,
    status: String,
    results: Option<Json<AnalysisResults>>,
    visualizations: Option<Json<Vec<ChartDescriptor>>>,
    insights: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRecord> for Analysis {
    type Error = PersistenceError;

    fn try_from(record: AnalysisRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            dataset_id: record.dataset_id,
            name: record.name,
            analysis_type: record.analysis_type.parse().map_err(PersistenceError::Corrupt)?,
            status: record.status.parse().map_err(PersistenceError::Corrupt)?,
            results: record.results.map(|r| r.0),
            visualizations: record.visualizations.map(|v| v.0),
            insights: record.insights,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, dataset), fields(dataset_id = %dataset.id))]
    async fn insert_dataset(&self, dataset: &Dataset) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO datasets (id, user_id, name, description, file_name, file_type, file_size,
                                  row_count, column_count, columns, preview, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(dataset.id)
        .bind(&dataset.user_id)
        .bind(&dataset.name)
        .bind(&dataset.description)
        .bind(&dataset.file_name)
        .bind(&dataset.file_type)
        .bind(dataset.file_size)
        .bind(dataset.row_count)
        .bind(dataset.column_count)
        .bind(Json(&dataset.columns))
        .bind(Json(&dataset.preview))
        .bind(dataset.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_dataset(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Dataset>, PersistenceError> {
        let sql = format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE id = $1 AND user_id = $2");

        let record = sqlx::query_as::<_, DatasetRecord>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Dataset::from))
    }

    async fn list_datasets(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<DatasetSummary>, PersistenceError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM datasets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let records = sqlx::query_as::<_, DatasetSummaryRecord>(
            r#"
            SELECT id, name, row_count, column_count, created_at
            FROM datasets
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: records.into_iter().map(DatasetSummary::from).collect(),
            total,
        })
    }

    #[tracing::instrument(skip(self, analysis), fields(analysis_id = %analysis.id))]
    async fn insert_analysis(&self, analysis: &Analysis) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO analyses (id, user_id, dataset_id, name, analysis_type, status, results,
                                  visualizations, insights, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(analysis.id)
        .bind(&analysis.user_id)
        .bind(analysis.dataset_id)
        .bind(&analysis.name)
        .bind(analysis.analysis_type.as_str())
        .bind(analysis.status.as_str())
        .bind(analysis.results.as_ref().map(Json))
        .bind(analysis.visualizations.as_ref().map(Json))
        .bind(&analysis.insights)
        .bind(analysis.created_at)
        .bind(analysis.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_analysis(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Analysis>, PersistenceError> {
        let sql =
            format!("SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = $1 AND user_id = $2");

        sqlx::query_as::<_, AnalysisRecord>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Analysis::try_from)
            .transpose()
    }

    async fn list_analyses(
        &self,
        user_id: &str,
        filter: &AnalysisFilter,
        page: PageRequest,
    ) -> Result<Page<Analysis>, PersistenceError> {
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM analyses
            WHERE user_id = $1
              AND ($2::UUID IS NULL OR dataset_id = $2)
              AND ($3::TEXT IS NULL OR status = $3)
            "#,
        )
        .bind(user_id)
        .bind(filter.dataset_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses \
             WHERE user_id = $1 \
               AND ($2::UUID IS NULL OR dataset_id = $2) \
               AND ($3::TEXT IS NULL OR status = $3) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4 OFFSET $5"
        );

        let items = sqlx::query_as::<_, AnalysisRecord>(&sql)
            .bind(user_id)
            .bind(filter.dataset_id)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Analysis::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page { items, total })
    }

    async fn mark_processing(&self, id: Uuid) -> Result<Analysis, PersistenceError> {
        self.transition(id, AnalysisStatus::Processing, None, None).await
    }

    async fn complete_analysis(
        &self,
        id: Uuid,
        results: &AnalysisResults,
        visualizations: &[ChartDescriptor],
    ) -> Result<Analysis, PersistenceError> {
        self.transition(id, AnalysisStatus::Completed, Some(results), Some(visualizations))
            .await
    }

    async fn fail_analysis(&self, id: Uuid) -> Result<Analysis, PersistenceError> {
        self.transition(id, AnalysisStatus::Failed, None, None).await
    }

    async fn set_insights(&self, id: Uuid, insights: &str) -> Result<Analysis, PersistenceError> {
        let sql = format!(
            "UPDATE analyses SET insights = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'completed' \
             RETURNING {ANALYSIS_COLUMNS}"
        );

        let record = sqlx::query_as::<_, AnalysisRecord>(&sql)
            .bind(id)
            .bind(insights)
            .fetch_optional(&self.pool)
            .await?;

        match record {
            Some(record) => record.try_into(),
            None => Err(self.rejection(id, AnalysisStatus::Completed).await),
        }
    }
}
