//! Bar chart derivation for quick visual inspection

use insightflow_common::Row;

use crate::models::{ChartDescriptor, ChartType, DataPoint};

/// Maximum number of charts derived per analysis
pub const MAX_CHARTS: usize = 3;

/// One bar chart per eligible column (first [`MAX_CHARTS`] only), one bar per preview row
///
/// Cells that are missing, null, non-numeric or NaN are plotted as 0.
pub fn derive_charts(eligible: &[&str], preview: &[Row]) -> Vec<ChartDescriptor> {
    eligible
        .iter()
        .take(MAX_CHARTS)
        .map(|&column| ChartDescriptor {
            chart_type: ChartType::Bar,
            title: column.to_string(),
            data: preview
                .iter()
                .enumerate()
                .map(|(idx, row)| DataPoint {
                    name: format!("Row {}", idx + 1),
                    value: row
                        .get(column)
                        .and_then(|v| v.as_number())
                        .filter(|v| !v.is_nan())
                        .unwrap_or(0.0),
                })
                .collect(),
        })
        .collect()
}
