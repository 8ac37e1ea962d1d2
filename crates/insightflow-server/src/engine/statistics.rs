//! Descriptive statistics over numeric preview columns
//!
//! A column is eligible when it is declared `number` and at least one preview row actually holds
//! a number under it. Declared types come from the first uploaded row only, so every value is
//! checked again here: nulls, text, booleans and NaN are dropped and do not count.

use insightflow_common::{ColumnMeta, ColumnType, Row, ScalarValue};

use crate::models::{AnalysisResults, StatisticsRecord};

/// Names of the eligible numeric columns, in declaration order
pub fn eligible_numeric_columns<'a>(columns: &'a [ColumnMeta], preview: &[Row]) -> Vec<&'a str> {
    columns
        .iter()
        .filter(|column| column.column_type == ColumnType::Number)
        .filter(|column| {
            preview
                .iter()
                .any(|row| row.get(&column.name).is_some_and(ScalarValue::is_number))
        })
        .map(|column| column.name.as_str())
        .collect()
}

/// Statistics for every eligible column that has at least one usable value
pub fn compute_statistics(columns: &[ColumnMeta], preview: &[Row]) -> AnalysisResults {
    compute_for(&eligible_numeric_columns(columns, preview), preview)
}

pub(crate) fn compute_for(eligible: &[&str], preview: &[Row]) -> AnalysisResults {
    let mut results = AnalysisResults::new();

    for &name in eligible {
        let values = numeric_values(name, preview);
        match summarize(&values) {
            Some(record) => {
                results.insert(name.to_string(), record);
            },
            None => tracing::debug!(column = %name, "No usable numeric values, column skipped"),
        }
    }

    results
}

/// Summarize a list of values; `None` when the list is empty
///
/// Variance is the population variance (divisor `n`).
pub fn summarize(values: &[f64]) -> Option<StatisticsRecord> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(StatisticsRecord {
        count: values.len() as u64,
        mean: round2(mean),
        median: round2(median),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        std_dev: round2(variance.sqrt()),
    })
}

fn numeric_values(column: &str, preview: &[Row]) -> Vec<f64> {
    preview
        .iter()
        .filter_map(|row| row.get(column).and_then(ScalarValue::as_number))
        .filter(|v| !v.is_nan())
        .collect()
}

fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    // Magnitudes this large carry no fractional digits to round
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::row;
    use proptest::prelude::*;

    fn column_rows(name: &str, values: Vec<ScalarValue>) -> Vec<Row> {
        values.into_iter().map(|v| row(&[(name, v)])).collect()
    }

    #[test]
    fn test_sales_example() {
        let columns = vec![ColumnMeta::number("Satış")];
        let preview = column_rows("Satış", vec![15i64.into(), 45i64.into(), 32i64.into()]);

        let results = compute_statistics(&columns, &preview);

        assert_eq!(
            results["Satış"],
            StatisticsRecord {
                count: 3,
                mean: 30.67,
                median: 32.0,
                min: 15.0,
                max: 45.0,
                std_dev: 12.28,
            }
        );
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(summarize(&[10.0, 20.0, 30.0, 40.0]).unwrap().median, 25.0);
        assert_eq!(summarize(&[5.0, 1.0, 9.0]).unwrap().median, 5.0);
    }

    #[test]
    fn test_single_value() {
        let record = summarize(&[7.5]).unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.mean, 7.5);
        assert_eq!(record.median, 7.5);
        assert_eq!(record.std_dev, 0.0);
    }

    #[test]
    fn test_empty_values() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_huge_values() {
        let single = summarize(&[1e307]).unwrap();
        assert_eq!(single.mean, 1e307);
        assert!(single.is_finite());

        // The sum overflows even though every input is finite
        let overflow = summarize(&[1e308, 1e308]).unwrap();
        assert!(!overflow.is_finite());
    }

    #[test]
    fn test_mixed_cells_are_filtered() {
        let columns = vec![ColumnMeta::number("Gelir")];
        let preview = column_rows(
            "Gelir",
            vec![
                10i64.into(),
                ScalarValue::Null,
                "n/a".into(),
                f64::NAN.into(),
                true.into(),
                ScalarValue::Float(20.5),
            ],
        );

        let record = &compute_statistics(&columns, &preview)["Gelir"];
        assert_eq!(record.count, 2);
        assert_eq!(record.min, 10.0);
        assert_eq!(record.max, 20.5);
        assert_eq!(record.mean, 15.25);
    }

    #[test]
    fn test_declared_number_without_numbers_is_skipped() {
        let columns = vec![ColumnMeta::number("Not")];
        let preview = column_rows("Not", vec!["a".into(), ScalarValue::Null]);

        assert!(compute_statistics(&columns, &preview).is_empty());
    }

    #[test]
    fn test_nan_only_column_is_eligible_but_skipped() {
        let columns = vec![ColumnMeta::number("x")];
        let preview = column_rows("x", vec![f64::NAN.into()]);

        assert_eq!(eligible_numeric_columns(&columns, &preview), vec!["x"]);
        assert!(compute_statistics(&columns, &preview).is_empty());
    }

    #[test]
    fn test_undeclared_numeric_column_is_ignored() {
        let columns = vec![ColumnMeta::new("Kod", ColumnType::String)];
        let preview = column_rows("Kod", vec![1i64.into(), 2i64.into()]);

        assert!(eligible_numeric_columns(&columns, &preview).is_empty());
    }

    #[test]
    fn test_results_follow_declaration_order() {
        let columns = vec![ColumnMeta::number("b"), ColumnMeta::number("a")];
        let preview = vec![row(&[("a", 1i64.into()), ("b", 2i64.into())])];

        let keys: Vec<_> = compute_statistics(&columns, &preview).keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    proptest! {
        #[test]
        fn prop_integer_samples_are_bounded(values in prop::collection::vec(-1_000_000i64..1_000_000, 1..=10)) {
            let floats: Vec<f64> = values.iter().map(|&v| v as f64).collect();
            let record = summarize(&floats).unwrap();

            prop_assert_eq!(record.count as usize, values.len());
            prop_assert!(record.min <= record.median && record.median <= record.max);
            prop_assert!(record.min <= record.mean && record.mean <= record.max);
            prop_assert!(record.std_dev >= 0.0);

            let all_equal = values.iter().all(|&v| v == values[0]);
            prop_assert_eq!(record.std_dev == 0.0, all_equal);
        }

        #[test]
        fn prop_float_samples_are_bounded(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..=10)) {
            let record = summarize(&values).unwrap();

            // mean and median are rounded to 0.01, so allow half a unit of slack
            prop_assert!(record.min - 0.005 <= record.median && record.median <= record.max + 0.005);
            prop_assert!(record.min - 0.005 <= record.mean && record.mean <= record.max + 0.005);
            prop_assert!(record.std_dev >= 0.0);
        }

        #[test]
        fn prop_count_never_exceeds_preview(cells in prop::collection::vec(
            prop_oneof![
                any::<i32>().prop_map(|v| ScalarValue::Int(v as i64)),
                Just(ScalarValue::Null),
                Just(ScalarValue::Float(f64::NAN)),
                "[a-z]{0,4}".prop_map(ScalarValue::Text),
            ],
            0..=10,
        )) {
            let columns = vec![ColumnMeta::number("v")];
            let preview = column_rows("v", cells.clone());
            let expected = cells.iter().filter(|c| matches!(c, ScalarValue::Int(_))).count();

            let results = compute_statistics(&columns, &preview);
            match results.get("v") {
                Some(record) => {
                    prop_assert_eq!(record.count as usize, expected);
                    prop_assert!(record.count as usize <= preview.len());
                },
                None => prop_assert_eq!(expected, 0),
            }
        }

        #[test]
        fn prop_deterministic(values in prop::collection::vec(-1.0e3f64..1.0e3, 0..=10)) {
            let columns = vec![ColumnMeta::number("v")];
            let preview = column_rows("v", values.into_iter().map(ScalarValue::Float).collect());

            prop_assert_eq!(
                compute_statistics(&columns, &preview),
                compute_statistics(&columns, &preview)
            );
        }
    }
}
