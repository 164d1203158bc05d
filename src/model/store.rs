//! Versioned model artifact store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<version>/pipeline_dc_fe.json      preparation pipeline
//! <root>/<version>/pipeline_clf.json        classifier pipeline
//! <root>/<version>/features_importance.png  feature importance plot
//! <root>/<version>/X_train.csv, X_test.csv, y_train.csv, y_test.csv
//! ```
//!
//! Artifacts are immutable once published, so a loaded version is cached
//! for the life of the store and never invalidated.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, info};
use serde::de::DeserializeOwned;

use super::{ClassifierArtifact, ClassifierPipeline, DataCleaningPipeline, FeatureMatrix};
use crate::error::{Result, SurvivalError};
use crate::pipeline::{outcome_values, read_table};

pub const PREPARATION_FILE: &str = "pipeline_dc_fe.json";
pub const CLASSIFIER_FILE: &str = "pipeline_clf.json";
pub const FEATURE_IMPORTANCE_FILE: &str = "features_importance.png";
pub const X_TRAIN_FILE: &str = "X_train.csv";
pub const X_TEST_FILE: &str = "X_test.csv";
pub const Y_TRAIN_FILE: &str = "y_train.csv";
pub const Y_TEST_FILE: &str = "y_test.csv";

/// Both pipelines of one published version
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub version: String,
    pub preparation: DataCleaningPipeline,
    pub classifier: ClassifierArtifact,
}

/// Pre-split evaluation data, already passed through the preparation pipeline
#[derive(Debug, Clone)]
pub struct EvaluationSplit {
    pub x_train: FeatureMatrix,
    pub y_train: Vec<usize>,
    pub x_test: FeatureMatrix,
    pub y_test: Vec<usize>,
}

/// Read-only access to published model versions
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    cache: RwLock<HashMap<String, Arc<ModelBundle>>>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Version directories under the root, sorted by name.
    pub fn available_versions(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            SurvivalError::unavailable("*", self.root.display().to_string(), e.to_string())
        })?;

        let mut versions: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// Load both pipelines of a version, from cache when already loaded.
    pub fn load(&self, version: &str) -> Result<Arc<ModelBundle>> {
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(bundle) = cache.get(version) {
                return Ok(Arc::clone(bundle));
            }
        }

        let bundle = self.load_uncached(version)?;

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        // A concurrent caller may have won the race; keep the first entry
        let entry = cache
            .entry(version.to_string())
            .or_insert_with(|| Arc::new(bundle));
        Ok(Arc::clone(entry))
    }

    /// Number of versions currently cached
    pub fn cached_versions(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn load_uncached(&self, version: &str) -> Result<ModelBundle> {
        let dir = self.version_dir(version)?;

        let preparation: DataCleaningPipeline = read_json(&dir, version, PREPARATION_FILE)?;
        preparation
            .check()
            .map_err(|e| SurvivalError::unavailable(version, PREPARATION_FILE, e.to_string()))?;

        let classifier: ClassifierArtifact = read_json(&dir, version, CLASSIFIER_FILE)?;
        classifier
            .check()
            .map_err(|e| SurvivalError::unavailable(version, CLASSIFIER_FILE, e.to_string()))?;

        let produced = preparation.output_features();
        if produced.as_slice() != classifier.features() {
            return Err(SurvivalError::unavailable(
                version,
                CLASSIFIER_FILE,
                format!(
                    "classifier expects {:?} but preparation produces {:?}",
                    classifier.features(),
                    produced
                ),
            ));
        }

        info!(
            "Loaded model version {} ({} classifier, {} features)",
            version,
            classifier.family(),
            produced.len()
        );

        Ok(ModelBundle {
            version: version.to_string(),
            preparation,
            classifier,
        })
    }

    /// Path of the feature importance image for a version.
    pub fn feature_importance_image(&self, version: &str) -> Result<PathBuf> {
        let path = self.version_dir(version)?.join(FEATURE_IMPORTANCE_FILE);
        if !path.is_file() {
            return Err(SurvivalError::unavailable(
                version,
                FEATURE_IMPORTANCE_FILE,
                "file not found",
            ));
        }
        Ok(path)
    }

    /// Load the train/test split stored alongside a version.
    pub fn evaluation_split(&self, version: &str) -> Result<EvaluationSplit> {
        let dir = self.version_dir(version)?;
        Ok(EvaluationSplit {
            x_train: read_features(&dir, version, X_TRAIN_FILE)?,
            y_train: read_labels(&dir, version, Y_TRAIN_FILE)?,
            x_test: read_features(&dir, version, X_TEST_FILE)?,
            y_test: read_labels(&dir, version, Y_TEST_FILE)?,
        })
    }

    fn version_dir(&self, version: &str) -> Result<PathBuf> {
        let dir = self.root.join(version);
        if !dir.is_dir() {
            return Err(SurvivalError::unavailable(
                version,
                dir.display().to_string(),
                "version directory not found",
            ));
        }
        Ok(dir)
    }
}

fn read_json<T: DeserializeOwned>(dir: &Path, version: &str, file: &str) -> Result<T> {
    let path = dir.join(file);
    let text = fs::read_to_string(&path)
        .map_err(|e| SurvivalError::unavailable(version, file, e.to_string()))?;
    debug!("Parsing artifact {}", path.display());
    serde_json::from_str(&text)
        .map_err(|e| SurvivalError::unavailable(version, file, format!("malformed artifact: {}", e)))
}

fn checked_path(dir: &Path, version: &str, file: &str) -> Result<PathBuf> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(SurvivalError::unavailable(version, file, "file not found"));
    }
    Ok(path)
}

fn read_features(dir: &Path, version: &str, file: &str) -> Result<FeatureMatrix> {
    let df = read_table(&checked_path(dir, version, file)?)?;
    FeatureMatrix::from_frame(&df)
}

fn read_labels(dir: &Path, version: &str, file: &str) -> Result<Vec<usize>> {
    let df = read_table(&checked_path(dir, version, file)?)?;
    let name = df
        .get_column_names()
        .first()
        .map(|s| s.to_string())
        .ok_or_else(|| SurvivalError::unavailable(version, file, "no columns"))?;

    outcome_values(&df, &name)?
        .into_iter()
        .map(|v| {
            v.map(usize::from)
                .ok_or_else(|| SurvivalError::schema(&name, "null label in evaluation split"))
        })
        .collect()
}
