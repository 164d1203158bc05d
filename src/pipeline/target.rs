//! Outcome column validation
//!
//! The outcome (`Survived`) must be a binary 0/1 column. CSV loading may hand
//! it over as integers or floats, so values are compared with a tolerance.

use polars::prelude::*;

use crate::error::{Result, SurvivalError};

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// Validate the outcome column and return its values as class indices.
///
/// Null outcomes are kept as `None` so callers can exclude those rows.
///
/// # Errors
/// `SchemaMismatch` if the column is missing, empty, all-null, non-numeric,
/// or holds anything other than 0 and 1.
pub fn outcome_values(df: &DataFrame, column: &str) -> Result<Vec<Option<u8>>> {
    let outcome = df
        .column(column)
        .map_err(|_| SurvivalError::schema(column, "outcome column not found"))?;

    if outcome.len() == 0 {
        return Err(SurvivalError::schema(column, "outcome column is empty"));
    }

    if outcome.null_count() == outcome.len() {
        return Err(SurvivalError::schema(
            column,
            "outcome column contains only null values",
        ));
    }

    if !outcome.dtype().is_primitive_numeric() && outcome.dtype() != &DataType::Boolean {
        return Err(SurvivalError::schema(
            column,
            format!("outcome column must be numeric 0/1, found {}", outcome.dtype()),
        ));
    }

    let float_col = outcome.cast(&DataType::Float64)?;
    let mut values = Vec::with_capacity(float_col.len());

    for v in float_col.f64()?.into_iter() {
        match v {
            Some(x) if x.abs() < TOLERANCE => values.push(Some(0)),
            Some(x) if (x - 1.0).abs() < TOLERANCE => values.push(Some(1)),
            Some(x) => {
                return Err(SurvivalError::schema(
                    column,
                    format!("outcome must be binary (0/1), found {}", x),
                ))
            }
            None => values.push(None),
        }
    }

    Ok(values)
}
