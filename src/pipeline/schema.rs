//! Feature schemas and live passenger records
//!
//! A [`FeatureSchema`] is the fixed, versioned set of inputs a preparation
//! pipeline was fit on. Live records are checked against it before any
//! transform runs: missing or mistyped features are hard errors, extra
//! columns are dropped.

use std::collections::BTreeMap;
use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurvivalError};

/// Column names of the passenger table
pub const SEX: &str = "Sex";
pub const PCLASS: &str = "Pclass";
pub const FARE: &str = "Fare";
pub const AGE: &str = "Age";
pub const EMBARKED: &str = "Embarked";
pub const SURVIVED: &str = "Survived";

/// How a feature is represented in the batch handed to a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// String-valued, encoded by the preparation pipeline
    Categorical,
    /// Real-valued
    Numeric,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Categorical => write!(f, "categorical"),
            FeatureKind::Numeric => write!(f, "numeric"),
        }
    }
}

/// A single declared input feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub fn categorical(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Categorical,
        }
    }

    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Numeric,
        }
    }
}

/// Ordered set of features a pipeline expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    pub fn new(features: Vec<FeatureSpec>) -> Self {
        Self { features }
    }

    /// The live-query schema: `{Sex, Pclass, Fare, Age}`
    pub fn passenger_inputs() -> Self {
        Self::new(vec![
            FeatureSpec::categorical(SEX),
            FeatureSpec::numeric(PCLASS),
            FeatureSpec::numeric(FARE),
            FeatureSpec::numeric(AGE),
        ])
    }

    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Check a batch against the schema and narrow it to the declared features.
    ///
    /// Columns that are entirely null are accepted for either kind and cast
    /// to the declared type, so imputation steps can still fill them.
    pub fn validate(&self, batch: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.features.len());

        for spec in &self.features {
            let column = batch
                .column(&spec.name)
                .map_err(|_| SurvivalError::schema(&spec.name, "missing feature"))?;

            let all_null = column.null_count() == column.len();
            let dtype = column.dtype();

            let column = match spec.kind {
                FeatureKind::Categorical => {
                    if all_null {
                        column.cast(&DataType::String)?
                    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
                        column.cast(&DataType::String)?
                    } else {
                        return Err(SurvivalError::schema(
                            &spec.name,
                            format!("wrong type: expected categorical (string), found {}", dtype),
                        ));
                    }
                }
                FeatureKind::Numeric => {
                    if all_null || dtype.is_primitive_numeric() {
                        column.cast(&DataType::Float64)?
                    } else {
                        return Err(SurvivalError::schema(
                            &spec.name,
                            format!("wrong type: expected numeric, found {}", dtype),
                        ));
                    }
                }
            };
            columns.push(column);
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// A single value of a live record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Missing => write!(f, "(missing)"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// One live passenger query, without an outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl LiveRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record with the four live-query features filled in
    pub fn passenger(sex: &str, pclass: u8, fare: f64, age: f64) -> Self {
        Self::new()
            .with(SEX, sex)
            .with(PCLASS, pclass as i64)
            .with(FARE, fare)
            .with(AGE, age)
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Wrap the record as a one-row batch, one column per field.
    pub fn to_batch(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .fields
            .iter()
            .map(|(name, value)| match value {
                FieldValue::Number(v) => Column::new(name.as_str().into(), [*v]),
                FieldValue::Text(s) => Column::new(name.as_str().into(), [s.as_str()]),
                FieldValue::Missing => Column::new(name.as_str().into(), [None::<f64>]),
            })
            .collect();

        if columns.is_empty() {
            return Ok(DataFrame::empty());
        }

        Ok(DataFrame::new(columns)?)
    }
}
