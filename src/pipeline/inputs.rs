//! Input ranges for live passenger entry
//!
//! Ranges are derived from the dataset each time they are needed. The fare
//! range depends on the class of the record being entered, so it is
//! recomputed from that record rather than remembered between calls.

use polars::prelude::*;
use serde::Serialize;

use super::schema::{AGE, FARE, PCLASS};
use crate::error::{Result, SurvivalError};

/// Allowed range and suggested default of a numeric input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn sorted_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df
        .column(name)
        .map_err(|_| SurvivalError::schema(name, "column not found"))?;
    let mut values: Vec<f64> = col
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .flatten()
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    Ok(values)
}

/// Fare range of one class (or every passenger), defaulting to the rounded median.
pub fn fare_bounds(df: &DataFrame, pclass: Option<u8>) -> Result<NumericRange> {
    let fares = sorted_values(df, FARE)?;
    let fares = match pclass {
        None => fares,
        Some(class) => {
            let classes: Vec<Option<f64>> = df
                .column(PCLASS)
                .map_err(|_| SurvivalError::schema(PCLASS, "column not found"))?
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .collect();
            let fare_col: Vec<Option<f64>> = df
                .column(FARE)?
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .collect();
            let mut selected: Vec<f64> = classes
                .into_iter()
                .zip(fare_col)
                .filter_map(|(c, f)| match (c, f) {
                    (Some(c), Some(f)) if c == class as f64 => Some(f),
                    _ => None,
                })
                .collect();
            selected.sort_by(|a, b| a.total_cmp(b));
            selected
        }
    };

    if fares.is_empty() {
        return Err(SurvivalError::schema(FARE, "no fares recorded for the selected class"));
    }

    Ok(NumericRange {
        min: fares[0],
        max: fares[fares.len() - 1],
        default: median(&fares).round(),
    })
}

/// Age range from zero to the oldest passenger, defaulting to the median age.
pub fn age_bounds(df: &DataFrame) -> Result<NumericRange> {
    let ages = sorted_values(df, AGE)?;
    if ages.is_empty() {
        return Err(SurvivalError::schema(AGE, "no ages recorded"));
    }

    Ok(NumericRange {
        min: 0.0,
        max: ages[ages.len() - 1].trunc(),
        default: median(&ages).trunc(),
    })
}

/// Distinct values of a categorical column in order of first appearance.
pub fn category_options(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let col = df
        .column(name)
        .map_err(|_| SurvivalError::schema(name, "column not found"))?;
    let mut options: Vec<String> = Vec::new();
    for v in col.cast(&DataType::String)?.str()?.into_iter().flatten() {
        if !options.iter().any(|o| o == v) {
            options.push(v.to_string());
        }
    }
    Ok(options)
}
