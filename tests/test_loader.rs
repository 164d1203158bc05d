//! Tests for passenger dataset loading and validation

#[path = "common/mod.rs"]
mod common;

use std::path::Path;
use std::sync::Arc;

use common::{assert_shape, create_temp_csv, create_temp_parquet, create_titanic_dataframe};
use polars::prelude::*;
use titanic_predictor::pipeline::{
    age_bounds, category_options, dataset_overview, fare_bounds, load_passenger_data, read_table,
    validate_passenger_schema, PassengerDataset,
};
use titanic_predictor::SurvivalError;

#[test]
fn test_load_csv() {
    let mut df = create_titanic_dataframe();
    let (_dir, path) = create_temp_csv(&mut df);

    let loaded = load_passenger_data(&path, true).unwrap();
    assert_shape(&loaded, 891, 6);
    assert_eq!(loaded.column("Age").unwrap().null_count(), 178);
}

#[test]
fn test_load_parquet() {
    let mut df = create_titanic_dataframe();
    let (_dir, path) = create_temp_parquet(&mut df);

    let loaded = load_passenger_data(&path, true).unwrap();
    assert_shape(&loaded, 891, 6);
}

#[test]
fn test_missing_file_unavailable() {
    let err = read_table(Path::new("/nonexistent/titanic.csv")).unwrap_err();
    assert!(matches!(err, SurvivalError::ArtifactUnavailable { .. }));
}

#[test]
fn test_unsupported_format_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("titanic.xlsx");
    std::fs::write(&path, "not a spreadsheet").unwrap();

    let err = read_table(&path).unwrap_err();
    match err {
        SurvivalError::ArtifactUnavailable { reason, .. } => assert!(reason.contains("unsupported")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_live_data_does_not_need_outcome() {
    let df = create_titanic_dataframe().drop("Survived").unwrap();
    assert!(validate_passenger_schema(&df, false).is_ok());
    assert!(matches!(
        validate_passenger_schema(&df, true),
        Err(SurvivalError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_missing_required_column() {
    let df = create_titanic_dataframe().drop("Embarked").unwrap();
    match validate_passenger_schema(&df, true).unwrap_err() {
        SurvivalError::SchemaMismatch { feature, .. } => assert_eq!(feature, "Embarked"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_pclass_rejected() {
    let df = df! {
        "Survived" => [0i64, 1],
        "Pclass" => [1i64, 4],
        "Sex" => ["male", "female"],
        "Age" => [30.0f64, 40.0],
        "Fare" => [10.0f64, 20.0],
        "Embarked" => ["S", "C"],
    }
    .unwrap();
    match validate_passenger_schema(&df, true).unwrap_err() {
        SurvivalError::SchemaMismatch { feature, .. } => assert_eq!(feature, "Pclass"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_negative_fare_rejected() {
    let df = df! {
        "Survived" => [0i64, 1],
        "Pclass" => [1i64, 3],
        "Sex" => ["male", "female"],
        "Age" => [Some(30.0f64), None],
        "Fare" => [-1.0f64, 20.0],
        "Embarked" => [Some("S"), None],
    }
    .unwrap();
    assert!(matches!(
        validate_passenger_schema(&df, true),
        Err(SurvivalError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_numeric_sex_rejected() {
    let df = df! {
        "Survived" => [0i64, 1],
        "Pclass" => [1i64, 3],
        "Sex" => [0i64, 1],
        "Age" => [30.0f64, 40.0],
        "Fare" => [10.0f64, 20.0],
        "Embarked" => ["S", "C"],
    }
    .unwrap();
    assert!(validate_passenger_schema(&df, true).is_err());
}

#[test]
fn test_dataset_loaded_once() {
    let mut df = create_titanic_dataframe();
    let (_dir, path) = create_temp_csv(&mut df);
    let dataset = PassengerDataset::new(&path);
    assert!(!dataset.is_loaded());

    let first = dataset.load().unwrap();
    assert!(dataset.is_loaded());

    // Served from memory even after the file is gone
    std::fs::remove_file(&path).unwrap();
    let second = dataset.load().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_dataset_load_failure_not_cached() {
    let dataset = PassengerDataset::new("/nonexistent/titanic.csv");
    assert!(dataset.load().is_err());
    assert!(!dataset.is_loaded());
}

#[test]
fn test_overview() {
    let df = create_titanic_dataframe();
    let overview = dataset_overview(&df).unwrap();

    assert_eq!(overview.rows, 891);
    assert_eq!(overview.columns, 6);
    assert!(overview.estimated_mb > 0.0);
    assert_eq!(overview.missing[0].0, "Age");
    assert!((overview.missing[0].1 - 178.0 / 891.0).abs() < 1e-12);
}

#[test]
fn test_input_ranges_from_dataset() {
    let df = create_titanic_dataframe();

    let all = fare_bounds(&df, None).unwrap();
    assert_eq!((all.min, all.max), (1.0, 891.0));
    assert_eq!(all.default, 446.0);

    let first = fare_bounds(&df, Some(1)).unwrap();
    assert!(first.max < all.max);

    let age = age_bounds(&df).unwrap();
    assert_eq!(age.min, 0.0);
    assert_eq!(age.max, 69.0);

    assert_eq!(category_options(&df, "Sex").unwrap(), vec!["female", "male"]);
}
