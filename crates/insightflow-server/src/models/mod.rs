//! Domain models
//!
//! Datasets are created once at upload time and never change afterwards. Analyses reference a
//! dataset and are mutated only by the analysis lifecycle (see `features::analyses`).

pub mod analysis;
pub mod dataset;

pub use analysis::{
    Analysis, AnalysisResults, AnalysisStatus, AnalysisType, ChartDescriptor, ChartType,
    DataPoint, StatisticsRecord,
};
pub use dataset::{Dataset, DatasetInvariantError, DatasetSummary};
