//! Titanic survival predictor: inference and statistical analysis library
//!
//! Predicts whether a passenger would have survived using versioned,
//! pre-trained preparation and classifier pipelines, tests independence
//! between survival and passenger attributes with a chi-squared test, and
//! discretizes continuous attributes into equal-frequency buckets.

pub mod cli;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use error::{Result, SurvivalError};
