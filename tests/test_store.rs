//! Tests for the versioned model artifact store and evaluation split

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{create_artifact_store, write_model_version, TEST_VERSION};
use tempfile::TempDir;
use titanic_predictor::model::{
    evaluate, ArtifactStore, ClassifierPipeline, CLASSIFIER_FILE, FEATURE_IMPORTANCE_FILE,
    PREPARATION_FILE, Y_TEST_FILE,
};
use titanic_predictor::SurvivalError;

#[test]
fn test_load_version() {
    let root = create_artifact_store();
    let store = ArtifactStore::new(root.path());
    let bundle = store.load(TEST_VERSION).unwrap();

    assert_eq!(bundle.version, TEST_VERSION);
    assert_eq!(bundle.classifier.family(), "logistic_regression");
    assert_eq!(
        bundle.preparation.output_features(),
        bundle.classifier.features().to_vec()
    );
}

#[test]
fn test_load_is_cached_once_per_version() {
    let root = create_artifact_store();
    let store = ArtifactStore::new(root.path());
    assert_eq!(store.cached_versions(), 0);

    let first = store.load(TEST_VERSION).unwrap();
    // Removing the files does not matter once the version is cached
    std::fs::remove_file(root.path().join(TEST_VERSION).join(CLASSIFIER_FILE)).unwrap();
    let second = store.load(TEST_VERSION).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.cached_versions(), 1);
}

#[test]
fn test_missing_version_unavailable() {
    let root = create_artifact_store();
    let store = ArtifactStore::new(root.path());

    match store.load("v99").unwrap_err() {
        SurvivalError::ArtifactUnavailable { version, .. } => assert_eq!(version, "v99"),
        other => panic!("expected ArtifactUnavailable, got {other}"),
    }
    assert_eq!(store.cached_versions(), 0);
}

#[test]
fn test_missing_classifier_file_unavailable() {
    let root = create_artifact_store();
    std::fs::remove_file(root.path().join(TEST_VERSION).join(CLASSIFIER_FILE)).unwrap();
    let store = ArtifactStore::new(root.path());

    match store.load(TEST_VERSION).unwrap_err() {
        SurvivalError::ArtifactUnavailable { artifact, .. } => assert_eq!(artifact, CLASSIFIER_FILE),
        other => panic!("expected ArtifactUnavailable, got {other}"),
    }
}

#[test]
fn test_malformed_json_unavailable() {
    let root = create_artifact_store();
    std::fs::write(
        root.path().join(TEST_VERSION).join(PREPARATION_FILE),
        "{ not json",
    )
    .unwrap();
    let store = ArtifactStore::new(root.path());

    match store.load(TEST_VERSION).unwrap_err() {
        SurvivalError::ArtifactUnavailable { artifact, reason, .. } => {
            assert_eq!(artifact, PREPARATION_FILE);
            assert!(reason.contains("malformed"));
        }
        other => panic!("expected ArtifactUnavailable, got {other}"),
    }
}

#[test]
fn test_incompatible_pipelines_rejected() {
    let root = create_artifact_store();
    let classifier = r#"{
        "model": "logistic_regression",
        "features": ["Sex", "Pclass"],
        "coefficients": [1.0, -1.0],
        "intercept": 0.0
    }"#;
    std::fs::write(root.path().join(TEST_VERSION).join(CLASSIFIER_FILE), classifier).unwrap();
    let store = ArtifactStore::new(root.path());

    assert!(matches!(
        store.load(TEST_VERSION),
        Err(SurvivalError::ArtifactUnavailable { .. })
    ));
}

#[test]
fn test_decision_tree_artifact_loads() {
    let root = create_artifact_store();
    let classifier = r#"{
        "model": "decision_tree",
        "features": ["Sex", "Pclass", "Fare", "Age"],
        "nodes": [
            {"node": "split", "feature": 0, "threshold": 0.5, "left": 1, "right": 2},
            {"node": "leaf", "value": [80.0, 20.0]},
            {"node": "leaf", "value": [10.0, 90.0]}
        ],
        "importances": [1.0, 0.0, 0.0, 0.0]
    }"#;
    std::fs::write(root.path().join(TEST_VERSION).join(CLASSIFIER_FILE), classifier).unwrap();
    let store = ArtifactStore::new(root.path());
    let bundle = store.load(TEST_VERSION).unwrap();

    assert_eq!(bundle.classifier.family(), "decision_tree");
    assert_eq!(bundle.classifier.feature_importances()[0].0, "Sex");
}

#[test]
fn test_available_versions_sorted() {
    let root = TempDir::new().unwrap();
    write_model_version(root.path(), "v3");
    write_model_version(root.path(), "v1");
    write_model_version(root.path(), "v2");
    std::fs::write(root.path().join("README.txt"), "not a version").unwrap();

    let store = ArtifactStore::new(root.path());
    assert_eq!(store.available_versions().unwrap(), vec!["v1", "v2", "v3"]);
}

#[test]
fn test_feature_importance_image() {
    let root = create_artifact_store();
    let store = ArtifactStore::new(root.path());

    let path = store.feature_importance_image(TEST_VERSION).unwrap();
    assert!(path.ends_with(FEATURE_IMPORTANCE_FILE));

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(
        store.feature_importance_image(TEST_VERSION),
        Err(SurvivalError::ArtifactUnavailable { .. })
    ));
}

#[test]
fn test_evaluation_split_and_report() {
    let root = create_artifact_store();
    let store = ArtifactStore::new(root.path());
    let bundle = store.load(TEST_VERSION).unwrap();
    let split = store.evaluation_split(TEST_VERSION).unwrap();

    assert_eq!(split.x_train.n_rows(), 4);
    assert_eq!(split.y_train, vec![1, 0, 0, 1]);
    assert_eq!(split.x_test.n_rows(), 2);

    let train = evaluate(&bundle.classifier, &split.x_train, &split.y_train).unwrap();
    assert_eq!(train.confusion, [[1, 1], [1, 1]]);
    assert!((train.accuracy - 0.5).abs() < 1e-12);

    let test = evaluate(&bundle.classifier, &split.x_test, &split.y_test).unwrap();
    assert_eq!(test.confusion, [[1, 0], [0, 1]]);
    assert!((test.accuracy - 1.0).abs() < 1e-12);
    assert!((test.classes[1].f1 - 1.0).abs() < 1e-12);
}

#[test]
fn test_evaluation_split_missing_labels() {
    let root = create_artifact_store();
    std::fs::remove_file(root.path().join(TEST_VERSION).join(Y_TEST_FILE)).unwrap();
    let store = ArtifactStore::new(root.path());

    assert!(matches!(
        store.evaluation_split(TEST_VERSION),
        Err(SurvivalError::ArtifactUnavailable { .. })
    ));
}
