//! Classifier performance on labelled feature matrices
//!
//! Produces the confusion matrix and per-class precision, recall and F1 for
//! the train and test splits published with each model version.

use serde::Serialize;

use super::{ClassifierPipeline, FeatureMatrix};
use crate::error::{Result, SurvivalError};

/// Display names of the two classes, by class index
pub const LABEL_MAP: [&str; 2] = ["Did Not Survive", "Survived"];

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Confusion matrix and per-class metrics for one split
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// `confusion[actual][predicted]`
    pub confusion: [[u64; 2]; 2],
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
}

/// Ratio that is zero when the denominator is zero
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Evaluate a classifier against known labels.
pub fn evaluate<C>(classifier: &C, x: &FeatureMatrix, y: &[usize]) -> Result<ClassificationReport>
where
    C: ClassifierPipeline + ?Sized,
{
    if x.n_rows() != y.len() {
        return Err(SurvivalError::schema(
            "labels",
            format!("{} feature rows but {} labels", x.n_rows(), y.len()),
        ));
    }

    let predicted = classifier.predict(x)?;
    let mut confusion = [[0u64; 2]; 2];
    for (actual, pred) in y.iter().zip(&predicted) {
        if *actual > 1 || *pred > 1 {
            return Err(SurvivalError::InvalidModelOutput(format!(
                "non-binary class pair (actual {}, predicted {})",
                actual, pred
            )));
        }
        confusion[*actual][*pred] += 1;
    }

    let classes = (0..2)
        .map(|c| {
            let tp = confusion[c][c];
            let predicted_c = confusion[0][c] + confusion[1][c];
            let support = confusion[c][0] + confusion[c][1];
            let precision = ratio(tp, predicted_c);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label: LABEL_MAP[c].to_string(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let correct = confusion[0][0] + confusion[1][1];
    Ok(ClassificationReport {
        confusion,
        classes,
        accuracy: ratio(correct, y.len() as u64),
    })
}
