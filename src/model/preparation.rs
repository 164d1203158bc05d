//! Data cleaning and feature engineering pipeline
//!
//! The fitted state (imputation values, category vocabularies) is loaded from
//! a JSON artifact. Steps run in order over a working copy of the validated
//! batch: imputation and log steps rewrite a column in place, encoding and
//! numeric steps emit output features.

use std::collections::BTreeMap;

use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FeatureMatrix, PreparationPipeline};
use crate::error::{Result, SurvivalError};
use crate::pipeline::{FeatureKind, FeatureSchema, FieldValue};

/// One fitted step of the preparation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PreparationStep {
    /// Replace nulls with a value fitted on training data (median, mode, ...)
    Impute { column: String, value: FieldValue },
    /// Replace `x` with `ln(1 + x)`
    LogTransform { column: String },
    /// Map each category to a numeric code
    OrdinalEncode {
        column: String,
        mapping: BTreeMap<String, f64>,
        /// Code used for categories outside `mapping`
        #[serde(default)]
        unknown: Option<f64>,
    },
    /// One indicator feature per category, named `{column}_{category}`
    OneHotEncode {
        column: String,
        categories: Vec<String>,
        #[serde(default)]
        drop_last: bool,
        /// Encode unseen categories as all zeros instead of failing
        #[serde(default)]
        ignore_unknown: bool,
    },
    /// Emit a numeric column unchanged
    Numeric { column: String },
}

impl PreparationStep {
    fn column(&self) -> &str {
        match self {
            PreparationStep::Impute { column, .. }
            | PreparationStep::LogTransform { column }
            | PreparationStep::OrdinalEncode { column, .. }
            | PreparationStep::OneHotEncode { column, .. }
            | PreparationStep::Numeric { column } => column,
        }
    }

    fn expected_kind(&self) -> Option<FeatureKind> {
        match self {
            PreparationStep::Impute { .. } => None,
            PreparationStep::LogTransform { .. } | PreparationStep::Numeric { .. } => {
                Some(FeatureKind::Numeric)
            }
            PreparationStep::OrdinalEncode { .. } | PreparationStep::OneHotEncode { .. } => {
                Some(FeatureKind::Categorical)
            }
        }
    }

    fn output_names(&self) -> Vec<String> {
        match self {
            PreparationStep::Impute { .. } | PreparationStep::LogTransform { .. } => Vec::new(),
            PreparationStep::OrdinalEncode { column, .. } | PreparationStep::Numeric { column } => {
                vec![column.clone()]
            }
            PreparationStep::OneHotEncode {
                column,
                categories,
                drop_last,
                ..
            } => {
                let kept = if *drop_last {
                    categories.len().saturating_sub(1)
                } else {
                    categories.len()
                };
                categories[..kept]
                    .iter()
                    .map(|c| format!("{}_{}", column, c))
                    .collect()
            }
        }
    }
}

/// Column of the working table
#[derive(Debug, Clone)]
enum WorkingColumn {
    Text(Vec<Option<String>>),
    Number(Vec<Option<f64>>),
}

/// Preparation pipeline artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCleaningPipeline {
    pub version: String,
    pub inputs: FeatureSchema,
    pub steps: Vec<PreparationStep>,
}

impl DataCleaningPipeline {
    pub fn new(version: &str, inputs: FeatureSchema, steps: Vec<PreparationStep>) -> Result<Self> {
        let pipeline = Self {
            version: version.to_string(),
            inputs,
            steps,
        };
        pipeline.check()?;
        Ok(pipeline)
    }

    /// Verify every step refers to a declared input of the right kind.
    pub fn check(&self) -> Result<()> {
        for step in &self.steps {
            let spec = self.inputs.get(step.column()).ok_or_else(|| {
                SurvivalError::schema(step.column(), "step refers to an undeclared input")
            })?;

            if let Some(kind) = step.expected_kind() {
                if kind != spec.kind {
                    return Err(SurvivalError::schema(
                        &spec.name,
                        format!("step expects a {} input, declared {}", kind, spec.kind),
                    ));
                }
            }

            if let PreparationStep::Impute { value, .. } = step {
                let matches = matches!(
                    (spec.kind, value),
                    (FeatureKind::Numeric, FieldValue::Number(_))
                        | (FeatureKind::Categorical, FieldValue::Text(_))
                );
                if !matches {
                    return Err(SurvivalError::schema(
                        &spec.name,
                        format!("imputation value {:?} does not match {} input", value, spec.kind),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Names of the features `transform` emits, in order.
    pub fn output_features(&self) -> Vec<String> {
        self.steps.iter().flat_map(|s| s.output_names()).collect()
    }

    fn working_table(&self, batch: &DataFrame) -> Result<BTreeMap<String, WorkingColumn>> {
        let narrowed = self.inputs.validate(batch)?;
        let mut table = BTreeMap::new();

        for spec in &self.inputs.features {
            let col = narrowed.column(&spec.name)?;
            let working = match spec.kind {
                FeatureKind::Categorical => WorkingColumn::Text(
                    col.str()?
                        .into_iter()
                        .map(|v| v.map(|s| s.to_string()))
                        .collect(),
                ),
                FeatureKind::Numeric => WorkingColumn::Number(col.f64()?.into_iter().collect()),
            };
            table.insert(spec.name.clone(), working);
        }

        Ok(table)
    }
}

fn require<T: Clone>(values: &[Option<T>], column: &str) -> Result<Vec<T>> {
    values
        .iter()
        .map(|v| {
            v.clone()
                .ok_or_else(|| SurvivalError::schema(column, "null value with no imputation step"))
        })
        .collect()
}

fn unknown_category(column: &str, value: &str, known: impl Iterator<Item = String>) -> SurvivalError {
    SurvivalError::UnknownCategory {
        feature: column.to_string(),
        value: value.to_string(),
        known: known.collect(),
    }
}

impl PreparationPipeline for DataCleaningPipeline {
    fn schema(&self) -> &FeatureSchema {
        &self.inputs
    }

    fn transform(&self, batch: &DataFrame) -> Result<FeatureMatrix> {
        let mut table = self.working_table(batch)?;
        let n_rows = batch.height();
        let mut names: Vec<String> = Vec::new();
        let mut outputs: Vec<Vec<f64>> = Vec::new();

        for step in &self.steps {
            let column = step.column();
            let working = table
                .get_mut(column)
                .ok_or_else(|| SurvivalError::schema(column, "missing feature"))?;

            match (step, working) {
                (PreparationStep::Impute { value: FieldValue::Number(fill), .. }, WorkingColumn::Number(values)) => {
                    values.iter_mut().filter(|v| v.is_none()).for_each(|v| *v = Some(*fill));
                }
                (PreparationStep::Impute { value: FieldValue::Text(fill), .. }, WorkingColumn::Text(values)) => {
                    values
                        .iter_mut()
                        .filter(|v| v.is_none())
                        .for_each(|v| *v = Some(fill.clone()));
                }
                (PreparationStep::LogTransform { .. }, WorkingColumn::Number(values)) => {
                    for v in values.iter_mut().flatten() {
                        if *v < 0.0 {
                            return Err(SurvivalError::schema(
                                column,
                                format!("log transform requires non-negative values, found {}", v),
                            ));
                        }
                        *v = v.ln_1p();
                    }
                }
                (PreparationStep::Numeric { .. }, WorkingColumn::Number(values)) => {
                    let values = require(values, column)?;
                    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                        return Err(SurvivalError::schema(column, format!("non-finite value {}", bad)));
                    }
                    names.push(column.to_string());
                    outputs.push(values);
                }
                (PreparationStep::OrdinalEncode { mapping, unknown, .. }, WorkingColumn::Text(values)) => {
                    let encoded = require(values, column)?
                        .iter()
                        .map(|v| match (mapping.get(v), unknown) {
                            (Some(code), _) => Ok(*code),
                            (None, Some(code)) => Ok(*code),
                            (None, None) => Err(unknown_category(column, v, mapping.keys().cloned())),
                        })
                        .collect::<Result<Vec<f64>>>()?;
                    names.push(column.to_string());
                    outputs.push(encoded);
                }
                (
                    PreparationStep::OneHotEncode {
                        categories,
                        drop_last,
                        ignore_unknown,
                        ..
                    },
                    WorkingColumn::Text(values),
                ) => {
                    let values = require(values, column)?;
                    if !ignore_unknown {
                        if let Some(v) = values.iter().find(|v| !categories.contains(v)) {
                            return Err(unknown_category(column, v, categories.iter().cloned()));
                        }
                    }
                    let kept = if *drop_last {
                        categories.len().saturating_sub(1)
                    } else {
                        categories.len()
                    };
                    for category in &categories[..kept] {
                        names.push(format!("{}_{}", column, category));
                        outputs.push(
                            values
                                .iter()
                                .map(|v| if v == category { 1.0 } else { 0.0 })
                                .collect(),
                        );
                    }
                }
                _ => {
                    return Err(SurvivalError::schema(
                        column,
                        "step does not match the column type",
                    ))
                }
            }
        }

        let rows: Vec<Vec<f64>> = (0..n_rows)
            .map(|i| outputs.iter().map(|col| col[i]).collect())
            .collect();

        debug!(
            "Prepared {} row(s) into {} feature(s) with pipeline {}",
            n_rows,
            names.len(),
            self.version
        );

        FeatureMatrix::new(names, rows)
    }
}
