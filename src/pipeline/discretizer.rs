//! Equal-frequency discretization of continuous columns
//!
//! Cut points are empirical quantiles (linear interpolation between order
//! statistics), so each bucket holds as close to `n / k` observations as the
//! data allows. When heavy ties make those quantiles collapse, cut points are
//! instead chosen among the distinct observed values so that the remaining
//! buckets stay balanced. A value equal to a cut point falls into the lower
//! bucket. Used for display only, never as a model input.

use log::debug;
use polars::prelude::*;
use serde::Serialize;

use super::hypothesis::{build_contingency, ContingencyTable, LevelOrder};
use super::target::outcome_values;
use crate::error::{Result, SurvivalError};

/// Ordered cut points splitting a column into `boundaries.len() + 1` buckets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinSpec {
    /// Name of the column the cut points were fit on
    pub column: String,
    /// Strictly increasing cut points
    pub boundaries: Vec<f64>,
}

impl BinSpec {
    pub fn bucket_count(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// Index of the bucket holding `value`; ties go to the lower bucket.
    pub fn bucket_of(&self, value: f64) -> usize {
        self.boundaries.partition_point(|b| *b < value)
    }

    /// Display label of bucket `index`
    pub fn label(&self, index: usize) -> String {
        let (first, last) = match (self.boundaries.first(), self.boundaries.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return "All values".to_string(),
        };
        if index == 0 {
            format!("< {}", display_bound(first))
        } else if index >= self.boundaries.len() {
            format!("> {}", display_bound(last))
        } else {
            format!(
                "{} to {}",
                display_bound(self.boundaries[index - 1]),
                display_bound(self.boundaries[index])
            )
        }
    }

    /// Labels of every bucket, lowest first
    pub fn labels(&self) -> Vec<String> {
        (0..self.bucket_count()).map(|i| self.label(i)).collect()
    }
}

/// Round to 2 decimal places, printed without trailing zeros
fn display_bound(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // Avoid printing "-0"
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// Linear-interpolated quantile of an ascending slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Cut points at distinct observed values, balancing cumulative counts.
///
/// Each cut aims at an equal share of the observations still above the
/// previous cut, so one heavily tied value does not starve the buckets after
/// it. Requires at least `bucket_count` distinct values.
fn distinct_cut_points(sorted: &[f64], bucket_count: usize) -> Vec<f64> {
    // (value, number of observations <= value)
    let mut cumulative: Vec<(f64, usize)> = Vec::new();
    for (i, v) in sorted.iter().enumerate() {
        match cumulative.last_mut() {
            Some(last) if last.0 == *v => last.1 = i + 1,
            _ => cumulative.push((*v, i + 1)),
        }
    }

    let n = sorted.len();
    let distinct = cumulative.len();
    let mut boundaries = Vec::with_capacity(bucket_count - 1);
    let mut taken = 0usize;
    let mut next = 0usize;

    for cut in 1..bucket_count {
        let remaining_buckets = bucket_count - cut + 1;
        let target = taken as f64 + (n - taken) as f64 / remaining_buckets as f64;
        // Leave one distinct value for every later bucket
        let highest = distinct - 1 - (bucket_count - cut);

        let mut chosen = next;
        for j in next..=highest {
            let gap = (cumulative[j].1 as f64 - target).abs();
            if gap < (cumulative[chosen].1 as f64 - target).abs() {
                chosen = j;
            }
        }

        boundaries.push(cumulative[chosen].0);
        taken = cumulative[chosen].1;
        next = chosen + 1;
    }
    boundaries
}

/// Fit equal-frequency cut points over raw values.
///
/// # Errors
/// `DegenerateDistribution` when there are fewer distinct values than
/// buckets or fewer than 2 buckets are requested.
pub fn fit_bucket_values(column: &str, values: &[f64], bucket_count: usize) -> Result<BinSpec> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut distinct = sorted.clone();
    distinct.dedup();

    if bucket_count < 2 || distinct.len() < bucket_count {
        return Err(SurvivalError::DegenerateDistribution {
            column: column.to_string(),
            distinct: distinct.len(),
            buckets: bucket_count,
        });
    }

    let mut spec = BinSpec {
        column: column.to_string(),
        boundaries: (1..bucket_count)
            .map(|k| quantile(&sorted, k as f64 / bucket_count as f64))
            .collect(),
    };

    let collapsed = spec.boundaries.windows(2).any(|w| w[0] >= w[1])
        || sorted_counts(&sorted, &spec).contains(&0);
    if collapsed {
        debug!(
            "Quantile cut points on '{}' collapse under ties, cutting at distinct values",
            column
        );
        spec.boundaries = distinct_cut_points(&sorted, bucket_count);
    }

    debug!(
        "Fitted {} equal-frequency buckets on '{}' ({} values)",
        bucket_count,
        column,
        sorted.len()
    );

    Ok(spec)
}

fn sorted_counts(sorted: &[f64], spec: &BinSpec) -> Vec<usize> {
    let mut counts = vec![0usize; spec.bucket_count()];
    for v in sorted {
        counts[spec.bucket_of(*v)] += 1;
    }
    counts
}

fn column_values(column: &Column) -> Result<Vec<Option<f64>>> {
    if !column.dtype().is_primitive_numeric() {
        return Err(SurvivalError::schema(
            column.name().as_str(),
            format!("expected numeric column, found {}", column.dtype()),
        ));
    }
    Ok(column.cast(&DataType::Float64)?.f64()?.into_iter().collect())
}

/// Fit equal-frequency cut points over a numeric column, skipping nulls.
pub fn fit_bucket(column: &Column, bucket_count: usize) -> Result<BinSpec> {
    let values: Vec<f64> = column_values(column)?.into_iter().flatten().collect();
    fit_bucket_values(column.name().as_str(), &values, bucket_count)
}

/// Bucket index of every value; nulls and NaN stay null.
pub fn bucket_indices(column: &Column, spec: &BinSpec) -> Result<Vec<Option<usize>>> {
    Ok(column_values(column)?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()).map(|x| spec.bucket_of(x)))
        .collect())
}

/// Replace every value with its bucket label, keeping the column name.
pub fn apply(column: &Column, spec: &BinSpec) -> Result<Column> {
    let labels = spec.labels();
    let values: Vec<Option<String>> = bucket_indices(column, spec)?
        .into_iter()
        .map(|idx| idx.map(|i| labels[i].clone()))
        .collect();
    Ok(Column::new(column.name().clone(), values))
}

/// Population of each bucket, lowest first
pub fn bucket_counts(column: &Column, spec: &BinSpec) -> Result<Vec<usize>> {
    let mut counts = vec![0usize; spec.bucket_count()];
    for idx in bucket_indices(column, spec)?.into_iter().flatten() {
        counts[idx] += 1;
    }
    Ok(counts)
}

/// Fit on `column` and return the frame with that column replaced by labels.
pub fn discretize_frame(
    df: &DataFrame,
    column: &str,
    bucket_count: usize,
) -> Result<(DataFrame, BinSpec)> {
    let source = df
        .column(column)
        .map_err(|_| SurvivalError::schema(column, "column not found"))?;
    let spec = fit_bucket(source, bucket_count)?;
    let labelled = apply(source, &spec)?;

    let mut out = df.clone();
    out.with_column(labelled)?;
    Ok((out, spec))
}

/// Cross-tabulate the outcome against the buckets of a continuous column.
///
/// Buckets appear in ascending order rather than label order.
pub fn survival_by_bucket(
    df: &DataFrame,
    outcome: &str,
    column: &str,
    bucket_count: usize,
) -> Result<(ContingencyTable, BinSpec)> {
    let (discretized, spec) = discretize_frame(df, column, bucket_count)?;
    let outcomes = outcome_values(df, outcome)?;
    let labels: Vec<Option<String>> = discretized
        .column(column)?
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();

    let table = build_contingency(
        outcome,
        column,
        &outcomes,
        &labels,
        LevelOrder::Given(spec.labels()),
    )?;
    Ok((table, spec))
}
