//! Single-record survival inference
//!
//! The record is wrapped as a one-row batch, passed through the preparation
//! pipeline and then the classifier. The reported probability is the one the
//! classifier assigns to the class it predicted, whatever its decision rule.

use std::fmt;

use log::debug;
use serde::Serialize;

use super::schema::LiveRecord;
use crate::error::{Result, SurvivalError};
use crate::model::{ClassifierPipeline, ModelBundle, PreparationPipeline};

/// Tolerance on probability rows summing to one
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Predicted fate of a passenger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SurvivalLabel {
    DidNotSurvive,
    Survived,
}

impl SurvivalLabel {
    /// Map a classifier class index (0 or 1) to a label
    pub fn from_class(class: usize) -> Result<Self> {
        match class {
            0 => Ok(SurvivalLabel::DidNotSurvive),
            1 => Ok(SurvivalLabel::Survived),
            other => Err(SurvivalError::InvalidModelOutput(format!(
                "class index {} is not a binary survival class",
                other
            ))),
        }
    }

    pub fn class_index(&self) -> usize {
        match self {
            SurvivalLabel::DidNotSurvive => 0,
            SurvivalLabel::Survived => 1,
        }
    }

    /// Human-facing phrase for the label
    pub fn phrase(&self) -> &'static str {
        match self {
            SurvivalLabel::Survived => "would have survived",
            SurvivalLabel::DidNotSurvive => "would not have survived",
        }
    }
}

impl fmt::Display for SurvivalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurvivalLabel::Survived => write!(f, "Survived"),
            SurvivalLabel::DidNotSurvive => write!(f, "Did Not Survive"),
        }
    }
}

/// Result of one inference call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: SurvivalLabel,
    /// Probability of `label` as a percentage, one decimal place
    pub probability: f64,
}

impl PredictionResult {
    pub fn phrase(&self) -> &'static str {
        self.label.phrase()
    }
}

fn to_percentage(p: f64) -> f64 {
    (p * 1000.0).round() / 10.0
}

fn check_probabilities(row: &[f64], classes: usize) -> Result<()> {
    if row.len() != classes {
        return Err(SurvivalError::InvalidModelOutput(format!(
            "{} probabilities for {} classes",
            row.len(),
            classes
        )));
    }
    if let Some(p) = row.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0) {
        return Err(SurvivalError::InvalidModelOutput(format!(
            "probability {} outside [0, 1]",
            p
        )));
    }
    let total: f64 = row.iter().sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(SurvivalError::InvalidModelOutput(format!(
            "class probabilities sum to {}",
            total
        )));
    }
    Ok(())
}

/// Predict the fate of one live passenger.
///
/// # Errors
/// - `SchemaMismatch` when a required feature is missing or mistyped
/// - `UnknownCategory` when a categorical value was never seen in training
/// - `InvalidModelOutput` when the classifier breaks its output contract
pub fn predict<P, C>(record: &LiveRecord, preparation: &P, classifier: &C) -> Result<PredictionResult>
where
    P: PreparationPipeline + ?Sized,
    C: ClassifierPipeline + ?Sized,
{
    let batch = record.to_batch()?;
    let features = preparation.transform(&batch)?;
    if features.n_rows() != 1 {
        return Err(SurvivalError::InvalidModelOutput(format!(
            "preparation produced {} rows for one record",
            features.n_rows()
        )));
    }

    let labels = classifier.predict(&features)?;
    let probabilities = classifier.predict_probability(&features)?;

    let (class, row) = match (labels.as_slice(), probabilities.as_slice()) {
        ([class], [row]) => (*class, row),
        _ => {
            return Err(SurvivalError::InvalidModelOutput(format!(
                "expected one prediction, got {} labels and {} probability rows",
                labels.len(),
                probabilities.len()
            )))
        }
    };

    check_probabilities(row, classifier.classes())?;
    let label = SurvivalLabel::from_class(class)?;
    let probability = row
        .get(class)
        .copied()
        .ok_or_else(|| SurvivalError::InvalidModelOutput(format!("no probability for class {}", class)))?;

    debug!("Predicted class {} with probability {:.4}", class, probability);

    Ok(PredictionResult {
        label,
        probability: to_percentage(probability),
    })
}

/// Predict with both pipelines of a loaded model version.
pub fn predict_with_bundle(record: &LiveRecord, bundle: &ModelBundle) -> Result<PredictionResult> {
    predict(record, &bundle.preparation, &bundle.classifier)
}
