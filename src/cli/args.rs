//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_DATA: &str = "outputs/datasets/collection/titanic_passengers.csv";
pub const DEFAULT_ARTIFACTS: &str = "outputs/ml_pipeline/predict-survivor";
pub const DEFAULT_VERSION: &str = "v3";

/// Titanic survival predictor - predict passenger survival and test what drove it
#[derive(Parser, Debug)]
#[command(name = "titanic-predictor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Historical passenger dataset (CSV or Parquet)
    #[arg(short, long, global = true, default_value = DEFAULT_DATA)]
    pub data: PathBuf,

    /// Root directory of the versioned model artifacts
    #[arg(short, long, global = true, default_value = DEFAULT_ARTIFACTS)]
    pub artifacts: PathBuf,

    /// Also write the result as JSON to this path
    #[arg(long, global = true)]
    pub json: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chi-squared test of independence between survival and passenger attributes
    Hypothesis {
        /// Binary outcome column (0 = did not survive, 1 = survived)
        #[arg(short, long, default_value = "Survived")]
        outcome: String,

        /// Categorical attributes to test against the outcome (comma-separated)
        #[arg(short = 'x', long, value_delimiter = ',', default_value = "Sex,Pclass")]
        explanatory: Vec<String>,

        /// Significance level for rejecting independence
        #[arg(long, default_value = "0.05", value_parser = validate_alpha)]
        alpha: f64,

        /// Apply Yates' continuity correction to 2x2 tables
        #[arg(long, default_value = "false")]
        yates: bool,
    },

    /// Split a continuous attribute into equal-frequency buckets
    Discretize {
        /// Continuous column to discretize
        #[arg(short, long, default_value = "Fare")]
        column: String,

        /// Number of buckets
        #[arg(short, long, default_value = "10", value_parser = validate_buckets)]
        buckets: usize,

        /// Skip the survival-by-bucket table
        #[arg(long, default_value = "false")]
        no_survival: bool,
    },

    /// Predict whether a passenger would have survived.
    /// Attributes not given on the command line are prompted for.
    Predict {
        /// Model version to use
        #[arg(short, long, default_value = DEFAULT_VERSION)]
        model_version: String,

        /// Passenger sex (e.g. "male", "female")
        #[arg(long)]
        sex: Option<String>,

        /// Passenger class: 1, 2 or 3
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
        pclass: Option<u8>,

        /// Ticket fare
        #[arg(long)]
        fare: Option<f64>,

        /// Passenger age in years
        #[arg(long)]
        age: Option<f64>,

        /// Fail instead of prompting for missing attributes
        #[arg(long, default_value = "false")]
        no_prompt: bool,
    },

    /// Confusion matrix, classification report and feature importance of a model version
    Evaluate {
        /// Model version to evaluate
        #[arg(short, long, default_value = DEFAULT_VERSION)]
        model_version: String,
    },

    /// Shape and missing values of the passenger dataset
    Overview,

    /// List the published model versions
    Versions,
}

impl Commands {
    /// Subcommand name, as recorded in exports
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Hypothesis { .. } => "hypothesis",
            Commands::Discretize { .. } => "discretize",
            Commands::Predict { .. } => "predict",
            Commands::Evaluate { .. } => "evaluate",
            Commands::Overview => "overview",
            Commands::Versions => "versions",
        }
    }
}

/// Validator for the significance level
fn validate_alpha(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("alpha must be between 0.0 and 1.0 (exclusive), got {}", value))
    }
}

/// Validator for the bucket count
fn validate_buckets(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid bucket count", s))?;

    if value < 2 {
        Err(format!("at least 2 buckets are required, got {}", value))
    } else {
        Ok(value)
    }
}
