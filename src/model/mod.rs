//! Model module - pipeline contracts, concrete adapters and the artifact store
//!
//! The inference engine only sees the [`PreparationPipeline`] and
//! [`ClassifierPipeline`] traits. Concrete model families live behind them.

pub mod classifier;
pub mod evaluation;
pub mod preparation;
pub mod store;

pub use classifier::*;
pub use evaluation::*;
pub use preparation::*;
pub use store::*;

use polars::prelude::*;
use serde::Serialize;

use crate::error::{Result, SurvivalError};
use crate::pipeline::FeatureSchema;

/// Cleaning and feature engineering, fit once on training data.
pub trait PreparationPipeline: Send + Sync {
    /// The input features the pipeline was fit on.
    fn schema(&self) -> &FeatureSchema;

    /// Transform a batch of raw records into model features.
    fn transform(&self, batch: &DataFrame) -> Result<FeatureMatrix>;
}

/// Scaling and classification, fit once on training data.
pub trait ClassifierPipeline: Send + Sync {
    /// Feature columns the classifier expects, in order.
    fn features(&self) -> &[String];

    /// Number of output classes.
    fn classes(&self) -> usize;

    /// Predicted class index per row.
    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<usize>>;

    /// Per-class probabilities per row. Each row sums to 1.
    fn predict_probability(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>>;
}

/// Named numeric feature columns, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix, checking every row has one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(SurvivalError::schema(
                "feature matrix",
                format!(
                    "row {} has {} values, expected {}",
                    bad,
                    rows[bad].len(),
                    columns.len()
                ),
            ));
        }
        Ok(Self { columns, rows })
    }

    /// Read every column of an already-prepared frame as `f64`.
    ///
    /// Nulls are rejected: a prepared matrix has no missing values.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = vec![Vec::with_capacity(columns.len()); df.height()];

        for name in &columns {
            let col = df.column(name)?;
            if !col.dtype().is_primitive_numeric() {
                return Err(SurvivalError::schema(
                    name,
                    format!("wrong type: expected numeric, found {}", col.dtype()),
                ));
            }
            let values = col.cast(&DataType::Float64)?;
            for (row, v) in rows.iter_mut().zip(values.f64()?.into_iter()) {
                let v = v.ok_or_else(|| SurvivalError::schema(name, "null value in prepared features"))?;
                row.push(v);
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Fail unless the matrix carries exactly `expected` columns in order.
    pub fn ensure_columns(&self, expected: &[String]) -> Result<()> {
        if self.columns == expected {
            return Ok(());
        }
        if let Some(missing) = expected.iter().find(|c| !self.columns.contains(c)) {
            return Err(SurvivalError::schema(missing, "missing feature"));
        }
        Err(SurvivalError::schema(
            "feature matrix",
            format!("expected columns {:?}, found {:?}", expected, self.columns),
        ))
    }
}

/// Normalize weights to sum to one; all-zero input stays zero.
fn normalize(weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.into_iter().map(|w| w / total).collect()
    } else {
        weights
    }
}
