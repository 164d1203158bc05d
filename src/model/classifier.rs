//! Classifier pipeline adapters
//!
//! Each model family carries an optional standard scaler followed by the
//! fitted estimator. Artifacts are JSON, tagged by `model`.

use serde::{Deserialize, Serialize};

use super::{normalize, ClassifierPipeline, FeatureMatrix};
use crate::error::{Result, SurvivalError};

/// Binary classifiers only: did-not-survive and survived
const BINARY_CLASSES: usize = 2;

fn default_threshold() -> f64 {
    0.5
}

/// Per-feature standardization `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| {
                // Constant training features have zero scale
                let s = if *s == 0.0 { 1.0 } else { *s };
                (x - m) / s
            })
            .collect()
    }

    fn check(&self, n_features: usize) -> Result<()> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(SurvivalError::InvalidModelOutput(format!(
                "scaler has {}/{} parameters for {} features",
                self.mean.len(),
                self.scale.len(),
                n_features
            )));
        }
        Ok(())
    }
}

fn scale_rows(scaler: &Option<StandardScaler>, x: &FeatureMatrix) -> Vec<Vec<f64>> {
    match scaler {
        Some(s) => x.rows().iter().map(|r| s.transform_row(r)).collect(),
        None => x.rows().to_vec(),
    }
}

/// Logistic regression over (optionally) standardized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub features: Vec<String>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Survival probability above which the positive class is predicted
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticRegression {
    pub fn check(&self) -> Result<()> {
        if self.coefficients.len() != self.features.len() {
            return Err(SurvivalError::InvalidModelOutput(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.features.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SurvivalError::InvalidModelOutput(format!(
                "decision threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if let Some(s) = &self.scaler {
            s.check(self.features.len())?;
        }
        Ok(())
    }

    fn positive_probabilities(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        x.ensure_columns(&self.features)?;
        Ok(scale_rows(&self.scaler, x)
            .iter()
            .map(|row| {
                let z: f64 = self.intercept
                    + row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(v, w)| v * w)
                        .sum::<f64>();
                1.0 / (1.0 + (-z).exp())
            })
            .collect())
    }

    /// |coefficient| normalized to sum to one
    pub fn feature_importances(&self) -> Vec<f64> {
        normalize(self.coefficients.iter().map(|c| c.abs()).collect())
    }
}

/// Node of a fitted decision tree, stored as a flat array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class weights of training samples reaching this leaf
    Leaf { value: Vec<f64> },
}

/// Decision tree classifier, root at node 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub features: Vec<String>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub nodes: Vec<TreeNode>,
    #[serde(default)]
    pub importances: Option<Vec<f64>>,
}

impl DecisionTree {
    pub fn check(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(SurvivalError::InvalidModelOutput("tree has no nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= self.features.len()
                        || *left >= self.nodes.len()
                        || *right >= self.nodes.len()
                    {
                        return Err(SurvivalError::InvalidModelOutput(format!(
                            "node {} refers outside the tree",
                            i
                        )));
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != BINARY_CLASSES
                        || value.iter().any(|w| *w < 0.0)
                        || value.iter().sum::<f64>() <= 0.0
                    {
                        return Err(SurvivalError::InvalidModelOutput(format!(
                            "leaf {} has invalid class weights {:?}",
                            i, value
                        )));
                    }
                }
            }
        }
        if let Some(s) = &self.scaler {
            s.check(self.features.len())?;
        }
        if let Some(imp) = &self.importances {
            if imp.len() != self.features.len() {
                return Err(SurvivalError::InvalidModelOutput(format!(
                    "{} importances for {} features",
                    imp.len(),
                    self.features.len()
                )));
            }
        }
        Ok(())
    }

    fn leaf_for(&self, row: &[f64]) -> Result<&[f64]> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(SurvivalError::InvalidModelOutput(
            "tree traversal did not reach a leaf".into(),
        ))
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        match &self.importances {
            Some(imp) => normalize(imp.clone()),
            None => vec![0.0; self.features.len()],
        }
    }
}

/// A classifier artifact of any supported model family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
}

impl ClassifierArtifact {
    pub fn check(&self) -> Result<()> {
        match self {
            ClassifierArtifact::LogisticRegression(m) => m.check(),
            ClassifierArtifact::DecisionTree(m) => m.check(),
        }
    }

    /// Feature names paired with their normalized importance, highest first.
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let importances = match self {
            ClassifierArtifact::LogisticRegression(m) => m.feature_importances(),
            ClassifierArtifact::DecisionTree(m) => m.feature_importances(),
        };
        let mut ranked: Vec<(String, f64)> = self
            .features()
            .iter()
            .cloned()
            .zip(importances)
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    pub fn family(&self) -> &'static str {
        match self {
            ClassifierArtifact::LogisticRegression(_) => "logistic_regression",
            ClassifierArtifact::DecisionTree(_) => "decision_tree",
        }
    }
}

impl ClassifierPipeline for ClassifierArtifact {
    fn features(&self) -> &[String] {
        match self {
            ClassifierArtifact::LogisticRegression(m) => &m.features,
            ClassifierArtifact::DecisionTree(m) => &m.features,
        }
    }

    fn classes(&self) -> usize {
        BINARY_CLASSES
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<usize>> {
        match self {
            ClassifierArtifact::LogisticRegression(m) => Ok(m
                .positive_probabilities(x)?
                .into_iter()
                .map(|p| usize::from(p > m.threshold))
                .collect()),
            ClassifierArtifact::DecisionTree(_) => Ok(self
                .predict_probability(x)?
                .iter()
                .map(|probs| {
                    // Ties go to the lower class index
                    probs
                        .iter()
                        .enumerate()
                        .fold((0, f64::MIN), |best, (i, p)| if *p > best.1 { (i, *p) } else { best })
                        .0
                })
                .collect()),
        }
    }

    fn predict_probability(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        match self {
            ClassifierArtifact::LogisticRegression(m) => Ok(m
                .positive_probabilities(x)?
                .into_iter()
                .map(|p| vec![1.0 - p, p])
                .collect()),
            ClassifierArtifact::DecisionTree(m) => {
                x.ensure_columns(&m.features)?;
                scale_rows(&m.scaler, x)
                    .iter()
                    .map(|row| {
                        let leaf = m.leaf_for(row)?;
                        let total: f64 = leaf.iter().sum();
                        Ok(leaf.iter().map(|w| w / total).collect())
                    })
                    .collect()
            }
        }
    }
}
