//! Statistics and chart derivation over a dataset preview
//!
//! Both computations are pure functions of `(columns, preview)`: they never fail and never look
//! at anything but the sample handed to them. Column eligibility is decided once and shared so the
//! statistics and the charts always agree on which columns are numeric.

pub mod statistics;
pub mod visualization;

use insightflow_common::{ColumnMeta, Row};

use crate::models::{AnalysisResults, ChartDescriptor};

pub use statistics::{compute_statistics, eligible_numeric_columns, summarize};
pub use visualization::{derive_charts, MAX_CHARTS};

/// Output of one engine run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub results: AnalysisResults,
    pub visualizations: Vec<ChartDescriptor>,
}

impl EngineOutput {
    /// First column whose statistics overflowed to a non-finite value
    pub fn non_finite_column(&self) -> Option<&str> {
        self.results
            .iter()
            .find(|(_, record)| !record.is_finite())
            .map(|(name, _)| name.as_str())
    }
}

/// Compute statistics and charts for a preview sample
pub fn run(columns: &[ColumnMeta], preview: &[Row]) -> EngineOutput {
    let eligible = eligible_numeric_columns(columns, preview);

    EngineOutput {
        results: statistics::compute_for(&eligible, preview),
        visualizations: derive_charts(&eligible, preview),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::row;
    use insightflow_common::ColumnType;

    #[test]
    fn test_run_on_empty_preview() {
        let columns = vec![ColumnMeta::number("Satış")];
        let output = run(&columns, &[]);

        assert!(output.results.is_empty());
        assert!(output.visualizations.is_empty());
    }

    #[test]
    fn test_run_statistics_and_charts_agree_on_columns() {
        let columns = vec![
            ColumnMeta::new("Ürün", ColumnType::String),
            ColumnMeta::number("Satış"),
            ColumnMeta::number("Boş"),
        ];
        let preview = vec![row(&[("Ürün", "Laptop".into()), ("Satış", 15i64.into())])];

        let output = run(&columns, &preview);

        let stat_columns: Vec<_> = output.results.keys().cloned().collect();
        let chart_columns: Vec<_> = output.visualizations.iter().map(|c| c.title.clone()).collect();
        assert_eq!(stat_columns, vec!["Satış"]);
        assert_eq!(chart_columns, vec!["Satış"]);
    }
}
