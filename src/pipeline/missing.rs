//! Missing value analysis

use polars::prelude::*;

use crate::error::Result;

/// Ratio of null values per column, sorted by ratio descending.
///
/// An empty frame has no ratios.
pub fn analyze_missing_values(df: &DataFrame) -> Result<Vec<(String, f64)>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;
    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count() as f64 / rows))
        .collect();

    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(missing_ratios)
}

/// Columns with at least one missing value
pub fn columns_with_missing(missing_ratios: &[(String, f64)]) -> Vec<&str> {
    missing_ratios
        .iter()
        .filter(|(_, ratio)| *ratio > 0.0)
        .map(|(name, _)| name.as_str())
        .collect()
}
