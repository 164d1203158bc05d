//! Shared test utilities and fixture generators
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tempfile::TempDir;
use titanic_predictor::model::{
    ClassifierArtifact, DataCleaningPipeline, LogisticRegression, PreparationStep,
    CLASSIFIER_FILE, FEATURE_IMPORTANCE_FILE, PREPARATION_FILE, X_TEST_FILE, X_TRAIN_FILE,
    Y_TEST_FILE, Y_TRAIN_FILE,
};
use titanic_predictor::pipeline::{FeatureSchema, FieldValue};

/// Version name of the fixture model
pub const TEST_VERSION: &str = "v-test";

/// Create a 891-passenger DataFrame with the canonical Titanic marginals
///
/// This DataFrame includes:
/// - `Sex` x `Survived`: 81 female died, 233 female survived, 468 male died, 109 male survived
/// - `Pclass` x `Survived`: 80/136 first, 97/87 second, 372/119 third class
/// - `Fare`: 891 distinct values 1.0..=891.0
/// - `Age`: every 5th passenger missing
/// - `Embarked`: S/C/Q with a few missing
pub fn create_titanic_dataframe() -> DataFrame {
    let groups = [("female", 0i64, 81usize), ("female", 1, 233), ("male", 0, 468), ("male", 1, 109)];
    // Class quotas per outcome: died, survived
    let mut quotas = [[80usize, 97, 372], [136, 87, 119]];

    let mut sex = Vec::with_capacity(891);
    let mut survived = Vec::with_capacity(891);
    let mut pclass = Vec::with_capacity(891);
    for (s, outcome, count) in groups {
        for _ in 0..count {
            let quota = &mut quotas[outcome as usize];
            let class = quota.iter().position(|q| *q > 0).unwrap();
            quota[class] -= 1;
            sex.push(s);
            survived.push(outcome);
            pclass.push(class as i64 + 1);
        }
    }

    let n = sex.len();
    let fare: Vec<f64> = (1..=n).map(|v| v as f64).collect();
    let age: Vec<Option<f64>> = (0..n)
        .map(|i| if i % 5 == 4 { None } else { Some((i % 70) as f64 + 1.0) })
        .collect();
    let embarked: Vec<Option<&str>> = (0..n)
        .map(|i| if i % 50 == 49 { None } else { Some(["S", "C", "Q"][i % 3]) })
        .collect();

    df! {
        "Survived" => survived,
        "Pclass" => pclass,
        "Sex" => sex,
        "Age" => age,
        "Fare" => fare,
        "Embarked" => embarked,
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
/// Fare column dominated by one ticket price: 300 fares of 8.05 below 591
/// distinct fares 10.0, 11.0, ..., 600.0.
pub fn create_tied_fares() -> Column {
    let mut fares = vec![8.05f64; 300];
    fares.extend((0..591).map(|i| 10.0 + i as f64));
    Column::new("Fare".into(), fares)
}

pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("titanic_passengers.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("titanic_passengers.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Preparation fixture: impute Age, encode Sex, log-scale Fare
pub fn fixture_preparation() -> DataCleaningPipeline {
    DataCleaningPipeline::new(
        TEST_VERSION,
        FeatureSchema::passenger_inputs(),
        vec![
            PreparationStep::Impute {
                column: "Age".into(),
                value: FieldValue::Number(28.0),
            },
            PreparationStep::OrdinalEncode {
                column: "Sex".into(),
                mapping: BTreeMap::from([("female".to_string(), 1.0), ("male".to_string(), 0.0)]),
                unknown: None,
            },
            PreparationStep::Numeric {
                column: "Pclass".into(),
            },
            PreparationStep::LogTransform {
                column: "Fare".into(),
            },
            PreparationStep::Numeric {
                column: "Fare".into(),
            },
            PreparationStep::Numeric {
                column: "Age".into(),
            },
        ],
    )
    .unwrap()
}

/// Classifier fixture favoring survival for first-class females
pub fn fixture_classifier() -> ClassifierArtifact {
    ClassifierArtifact::LogisticRegression(LogisticRegression {
        features: vec!["Sex".into(), "Pclass".into(), "Fare".into(), "Age".into()],
        scaler: None,
        coefficients: vec![2.5, -1.0, 0.3, -0.02],
        intercept: 0.5,
        threshold: 0.5,
    })
}

/// Prepared training rows; the fixture classifier predicts 1, 0, 1, 0
pub const X_TRAIN_CSV: &str = "Sex,Pclass,Fare,Age\n1,1,4.0,30\n0,3,2.0,40\n1,2,3.0,20\n0,1,4.0,50\n";
pub const Y_TRAIN_CSV: &str = "Survived\n1\n0\n0\n1\n";
/// Prepared test rows; the fixture classifier predicts 1, 0
pub const X_TEST_CSV: &str = "Sex,Pclass,Fare,Age\n1,1,4.0,30\n0,3,2.0,40\n";
pub const Y_TEST_CSV: &str = "Survived\n1\n0\n";

/// Publish a complete model version under `root`
pub fn write_model_version(root: &Path, version: &str) -> PathBuf {
    let dir = root.join(version);
    std::fs::create_dir_all(&dir).unwrap();

    let mut preparation = fixture_preparation();
    preparation.version = version.to_string();
    std::fs::write(
        dir.join(PREPARATION_FILE),
        serde_json::to_string_pretty(&preparation).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.join(CLASSIFIER_FILE),
        serde_json::to_string_pretty(&fixture_classifier()).unwrap(),
    )
    .unwrap();

    // Only existence is checked, any bytes will do
    std::fs::write(dir.join(FEATURE_IMPORTANCE_FILE), b"\x89PNG\r\n\x1a\n").unwrap();
    std::fs::write(dir.join(X_TRAIN_FILE), X_TRAIN_CSV).unwrap();
    std::fs::write(dir.join(Y_TRAIN_FILE), Y_TRAIN_CSV).unwrap();
    std::fs::write(dir.join(X_TEST_FILE), X_TEST_CSV).unwrap();
    std::fs::write(dir.join(Y_TEST_FILE), Y_TEST_CSV).unwrap();

    dir
}

/// Create a temporary artifact store holding the fixture version
pub fn create_artifact_store() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_model_version(temp_dir.path(), TEST_VERSION);
    temp_dir
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}
