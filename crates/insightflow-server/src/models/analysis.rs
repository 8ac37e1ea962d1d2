//! Analysis model and its lifecycle states

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use insightflow_common::types::serialize_number;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Statistics keyed by column name, in column declaration order
pub type AnalysisResults = IndexMap<String, StatisticsRecord>;

/// Kind of analysis requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Descriptive,
    Correlation,
    Regression,
    Clustering,
    Timeseries,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 5] = [
        AnalysisType::Descriptive,
        AnalysisType::Correlation,
        AnalysisType::Regression,
        AnalysisType::Clustering,
        AnalysisType::Timeseries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Descriptive => "descriptive",
            AnalysisType::Correlation => "correlation",
            AnalysisType::Regression => "regression",
            AnalysisType::Clustering => "clustering",
            AnalysisType::Timeseries => "timeseries",
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid analysis type: {}. Must be one of: {}",
                    s,
                    AnalysisType::ALL.map(|t| t.as_str()).join(", ")
                )
            })
    }
}

/// Lifecycle state of an analysis
///
/// ```text
/// pending -> processing -> completed
///                       \-> failed
/// ```
///
/// `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        use AnalysisStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending | Processing, Completed) | (Pending | Processing, Failed)
        )
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "processing" => Ok(AnalysisStatus::Processing),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            _ => Err(format!("Invalid analysis status: {}", s)),
        }
    }
}

/// Descriptive statistics for one numeric column
///
/// `mean`, `median` and `std_dev` are rounded to two decimals; `min` and `max` are raw values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    pub count: u64,
    #[serde(serialize_with = "serialize_number")]
    pub mean: f64,
    #[serde(serialize_with = "serialize_number")]
    pub median: f64,
    #[serde(serialize_with = "serialize_number")]
    pub min: f64,
    #[serde(serialize_with = "serialize_number")]
    pub max: f64,
    #[serde(serialize_with = "serialize_number")]
    pub std_dev: f64,
}

impl StatisticsRecord {
    /// Whether every figure is a finite number (JSON has no encoding for the others)
    pub fn is_finite(&self) -> bool {
        [self.mean, self.median, self.min, self.max, self.std_dev]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
}

/// One renderable chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub data: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub name: String,
    #[serde(serialize_with = "serialize_number")]
    pub value: f64,
}

/// An analysis run over one dataset
///
/// A `completed` analysis always carries `results` (possibly empty); a `failed` one never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: Uuid,
    pub user_id: String,
    pub dataset_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub status: AnalysisStatus,
    pub results: Option<AnalysisResults>,
    pub visualizations: Option<Vec<ChartDescriptor>>,
    pub insights: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Analysis {
    /// A fresh analysis in the `pending` state
    pub fn pending(
        user_id: impl Into<String>,
        dataset_id: Uuid,
        name: impl Into<String>,
        analysis_type: AnalysisType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            dataset_id,
            name: name.into(),
            analysis_type,
            status: AnalysisStatus::Pending,
            results: None,
            visualizations: None,
            insights: None,
            created_at: now,
            updated_at: now,
        }
    }
}
