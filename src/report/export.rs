//! JSON export of command results

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::model::ClassificationReport;
use crate::pipeline::{BinSpec, ContingencyTable, HypothesisResult, LiveRecord, PredictionResult};

/// Metadata about the run that produced an export
#[derive(Debug, Serialize)]
pub struct ExportMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub app_version: String,
    /// Subcommand that produced the result
    pub command: String,
    /// Dataset path or artifact root the command read
    pub source: String,
}

impl ExportMetadata {
    pub fn now(command: &str, source: &Path) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            command: command.to_string(),
            source: source.display().to_string(),
        }
    }
}

/// A command result wrapped with its metadata
#[derive(Debug, Serialize)]
pub struct ResultExport<'a, T: Serialize> {
    pub metadata: ExportMetadata,
    pub result: &'a T,
}

/// One factor of a hypothesis run
#[derive(Debug, Serialize)]
pub struct HypothesisExportEntry {
    pub explanatory: String,
    pub significant: bool,
    #[serde(flatten)]
    pub result: HypothesisResult,
}

#[derive(Debug, Serialize)]
pub struct HypothesisExport {
    pub outcome: String,
    pub alpha: f64,
    pub continuity_correction: bool,
    pub tests: Vec<HypothesisExportEntry>,
    /// Factors whose test could not be run, with the reason
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct DiscretizationExport {
    pub spec: BinSpec,
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survival: Option<ContingencyTable>,
}

#[derive(Debug, Serialize)]
pub struct PredictionExport {
    pub version: String,
    pub record: LiveRecord,
    pub prediction: PredictionResult,
    pub statement: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationExport {
    pub version: String,
    pub model: String,
    pub train: ClassificationReport,
    pub test: ClassificationReport,
    pub feature_importances: Vec<(String, f64)>,
}

/// Write `result` with run metadata to `output_path` as pretty JSON
pub fn export_json<T: Serialize>(
    command: &str,
    source: &Path,
    result: &T,
    output_path: &Path,
) -> Result<()> {
    let export = ResultExport {
        metadata: ExportMetadata::now(command, source),
        result,
    };

    let json = serde_json::to_string_pretty(&export)
        .with_context(|| format!("Failed to serialize {} result to JSON", command))?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write {} result to {}", command, output_path.display()))?;

    Ok(())
}
