//! Passenger dataset loader for CSV and Parquet files

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use log::debug;
use polars::prelude::*;
use serde::Serialize;

use super::missing::analyze_missing_values;
use super::schema::{AGE, EMBARKED, FARE, PCLASS, SEX, SURVIVED};
use super::target::outcome_values;
use crate::error::{Result, SurvivalError};

/// Number of rows used for CSV schema inference
const INFER_SCHEMA_LENGTH: usize = 10_000;

/// Load a table from a file (CSV or Parquet based on extension)
pub fn read_table(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(SurvivalError::unavailable(
            "dataset",
            path.display().to_string(),
            "file not found",
        ));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
            .finish()?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())?,
        _ => {
            return Err(SurvivalError::unavailable(
                "dataset",
                path.display().to_string(),
                format!(
                    "unsupported file format: {}. Supported formats: csv, parquet",
                    extension
                ),
            ))
        }
    };

    let df = lf.collect()?;
    debug!("Read {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Load the passenger table and check it against the passenger schema.
///
/// `require_outcome` is set for historical data, which must carry `Survived`.
pub fn load_passenger_data(path: &Path, require_outcome: bool) -> Result<DataFrame> {
    let df = read_table(path)?;
    validate_passenger_schema(&df, require_outcome)?;
    Ok(df)
}

/// Check column presence, types, and value ranges of a passenger table.
pub fn validate_passenger_schema(df: &DataFrame, require_outcome: bool) -> Result<()> {
    for name in [SEX, EMBARKED] {
        let col = column(df, name)?;
        let all_null = col.null_count() == col.len();
        if !all_null && !matches!(col.dtype(), DataType::String | DataType::Categorical(_, _)) {
            return Err(SurvivalError::schema(
                name,
                format!("expected string column, found {}", col.dtype()),
            ));
        }
    }
    if column(df, SEX)?.null_count() > 0 {
        return Err(SurvivalError::schema(SEX, "null values are not allowed"));
    }

    let pclass = numeric_values(df, PCLASS)?;
    for v in &pclass {
        match v {
            Some(c) if [1.0, 2.0, 3.0].contains(c) => {}
            Some(c) => {
                return Err(SurvivalError::schema(
                    PCLASS,
                    format!("class must be 1, 2 or 3, found {}", c),
                ))
            }
            None => return Err(SurvivalError::schema(PCLASS, "null values are not allowed")),
        }
    }

    let fare = numeric_values(df, FARE)?;
    if fare.iter().any(|v| v.is_none()) {
        return Err(SurvivalError::schema(FARE, "null values are not allowed"));
    }
    for (name, values) in [(FARE, fare), (AGE, numeric_values(df, AGE)?)] {
        if let Some(v) = values.iter().flatten().find(|v| **v < 0.0 || !v.is_finite()) {
            return Err(SurvivalError::schema(
                name,
                format!("values must be non-negative, found {}", v),
            ));
        }
    }

    if require_outcome {
        outcome_values(df, SURVIVED)?;
    }

    Ok(())
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| SurvivalError::schema(name, "required column not found"))
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = column(df, name)?;
    if !col.dtype().is_primitive_numeric() {
        return Err(SurvivalError::schema(
            name,
            format!("expected numeric column, found {}", col.dtype()),
        ));
    }
    Ok(col.cast(&DataType::Float64)?.f64()?.into_iter().collect())
}

/// Passenger table loaded at most once and then shared read-only
#[derive(Debug)]
pub struct PassengerDataset {
    path: PathBuf,
    data: OnceLock<Arc<DataFrame>>,
}

impl PassengerDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }

    /// The historical passenger table, including the outcome column.
    pub fn load(&self) -> Result<Arc<DataFrame>> {
        if let Some(df) = self.data.get() {
            return Ok(Arc::clone(df));
        }
        let df = Arc::new(load_passenger_data(&self.path, true)?);
        // If another caller populated the cell first, serve theirs
        Ok(Arc::clone(self.data.get_or_init(|| df)))
    }
}

/// Shape, size and missingness of a dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub columns: usize,
    pub estimated_mb: f64,
    /// (column, missing ratio), highest first
    pub missing: Vec<(String, f64)>,
}

/// Summarize a dataset for inspection
pub fn dataset_overview(df: &DataFrame) -> Result<DatasetOverview> {
    let (rows, columns) = df.shape();
    let estimated_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);

    Ok(DatasetOverview {
        rows,
        columns,
        estimated_mb,
        missing: analyze_missing_values(df)?,
    })
}
