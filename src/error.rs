//! Error types for the inference and analysis engine.
//!
//! Every failure is a data-contract violation reported synchronously to the
//! caller. Nothing here is retried and nothing falls back to a default value.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the dataset, analysis and inference operations.
#[derive(Debug, Error)]
pub enum SurvivalError {
    /// A required feature is absent, has the wrong type, or holds an invalid value.
    #[error("Schema mismatch for '{feature}': {reason}")]
    SchemaMismatch {
        /// Column or feature name
        feature: String,
        /// What was wrong with it
        reason: String,
    },

    /// A categorical value was never seen when the pipeline was fit.
    #[error("Unknown category '{value}' for feature '{feature}' (known: {known:?})")]
    UnknownCategory {
        feature: String,
        value: String,
        known: Vec<String>,
    },

    /// A statistical test was given a column with fewer than two observed levels.
    #[error("Insufficient variation in '{column}': {levels} observed level(s), at least 2 required")]
    InsufficientVariation { column: String, levels: usize },

    /// Too few distinct values to cut the requested number of buckets.
    #[error(
        "Degenerate distribution in '{column}': {distinct} distinct value(s) cannot form {buckets} buckets"
    )]
    DegenerateDistribution {
        column: String,
        distinct: usize,
        buckets: usize,
    },

    /// The requested model or dataset version could not be found or read.
    #[error("Artifact '{artifact}' unavailable for version '{version}': {reason}")]
    ArtifactUnavailable {
        version: String,
        artifact: String,
        reason: String,
    },

    /// The classifier returned a class or probability outside its contract.
    #[error("Invalid model output: {0}")]
    InvalidModelOutput(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SurvivalError {
    /// Shorthand for a [`SurvivalError::SchemaMismatch`].
    pub fn schema(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        SurvivalError::SchemaMismatch {
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`SurvivalError::ArtifactUnavailable`].
    pub fn unavailable(
        version: impl Into<String>,
        artifact: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SurvivalError::ArtifactUnavailable {
            version: version.into(),
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, SurvivalError>;
