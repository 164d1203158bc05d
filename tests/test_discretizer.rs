//! Tests for equal-frequency discretization

#[path = "common/mod.rs"]
mod common;

use common::{create_tied_fares, create_titanic_dataframe};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use titanic_predictor::pipeline::{
    apply, bucket_counts, bucket_indices, discretize_frame, fit_bucket, survival_by_bucket,
    OutcomeClass,
};
use titanic_predictor::SurvivalError;

#[test]
fn test_fare_ten_buckets_equal_frequency() {
    let df = create_titanic_dataframe();
    let fare = df.column("Fare").unwrap();
    let spec = fit_bucket(fare, 10).unwrap();

    assert_eq!(spec.bucket_count(), 10);
    assert_eq!(spec.boundaries.len(), 9);
    assert!(spec.boundaries.windows(2).all(|w| w[0] < w[1]));

    let counts = bucket_counts(fare, &spec).unwrap();
    assert_eq!(counts.iter().sum::<usize>(), 891);
    for c in &counts {
        assert!((*c as i64 - 89).abs() <= 1, "bucket count {} not within 1 of 89", c);
    }

    let labels = spec.labels();
    assert!(labels[0].starts_with("< "), "lowest label was {}", labels[0]);
    assert!(labels[9].starts_with("> "));
    assert_eq!(labels[0], "< 90");
    assert_eq!(labels[1], "90 to 179");
}

#[test]
fn test_apply_is_idempotent() {
    let df = create_titanic_dataframe();
    let fare = df.column("Fare").unwrap();
    let spec = fit_bucket(fare, 10).unwrap();

    let first = apply(fare, &spec).unwrap();
    let second = apply(fare, &spec).unwrap();
    let first: Vec<Option<String>> = first
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(String::from))
        .collect();
    let second: Vec<Option<String>> = second
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(String::from))
        .collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 891);
}

#[test]
fn test_fit_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(42);
    let values: Vec<f64> = (0..500).map(|_| rng.gen_range(0.0..500.0)).collect();
    let col = Column::new("Fare".into(), values);

    let a = fit_bucket(&col, 7).unwrap();
    let b = fit_bucket(&col, 7).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.labels(), b.labels());
}

#[test]
fn test_random_column_populations_balanced() {
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<f64> = (0..1000).map(|_| rng.gen::<f64>() * 100.0).collect();
    let col = Column::new("Age".into(), values);

    let spec = fit_bucket(&col, 4).unwrap();
    let counts = bucket_counts(&col, &spec).unwrap();
    assert_eq!(counts.len(), 4);
    for c in counts {
        assert!((249..=251).contains(&c), "bucket count {}", c);
    }
}

#[test]
fn test_nulls_skipped_when_fitting() {
    let col = Column::new(
        "Age".into(),
        [Some(1.0f64), None, Some(2.0), Some(3.0), None, Some(4.0)],
    );
    let spec = fit_bucket(&col, 2).unwrap();
    assert_eq!(spec.boundaries, vec![2.5]);

    let counts = bucket_counts(&col, &spec).unwrap();
    assert_eq!(counts, vec![2, 2]);
}

#[test]
fn test_tied_fares_still_give_requested_buckets() {
    let fare = create_tied_fares();
    let spec = fit_bucket(&fare, 10).unwrap();

    assert_eq!(spec.bucket_count(), 10);
    assert!(spec.boundaries.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(
        spec.boundaries,
        vec![8.05, 75.0, 141.0, 207.0, 272.0, 338.0, 403.0, 469.0, 534.0]
    );

    // The tied fare fills the first bucket; the rest share the remainder evenly
    let counts = bucket_counts(&fare, &spec).unwrap();
    assert_eq!(counts, vec![300, 66, 66, 66, 65, 66, 65, 66, 65, 66]);
    assert_eq!(counts.iter().sum::<usize>(), 891);
}

#[test]
fn test_tied_fares_land_in_lower_bucket() {
    let fare = create_tied_fares();
    let spec = fit_bucket(&fare, 10).unwrap();
    let indices = bucket_indices(&fare, &spec).unwrap();

    assert!(indices[..300].iter().all(|i| *i == Some(0)));
    // 75.0 is a cut point and 76.0 is just above it
    assert_eq!(indices[300 + 65], Some(1));
    assert_eq!(indices[300 + 66], Some(2));

    let labels = apply(&fare, &spec).unwrap();
    let labels = labels.str().unwrap();
    assert_eq!(labels.get(0), Some("< 8.05"));
    assert_eq!(labels.get(300 + 65), Some("8.05 to 75"));
    assert_eq!(labels.get(890), Some("> 534"));
}

#[test]
fn test_too_few_distinct_values_is_degenerate() {
    let col = Column::new("Pclass".into(), [1i64, 2, 3, 1, 2, 3]);
    let err = fit_bucket(&col, 10).unwrap_err();
    assert!(matches!(
        err,
        SurvivalError::DegenerateDistribution {
            distinct: 3,
            buckets: 10,
            ..
        }
    ));
}

#[test]
fn test_discretize_frame_replaces_column() {
    let df = create_titanic_dataframe();
    let (out, spec) = discretize_frame(&df, "Fare", 4).unwrap();

    assert_eq!(out.shape(), df.shape());
    let fare = out.column("Fare").unwrap();
    assert_eq!(fare.dtype(), &DataType::String);
    let first = fare.str().unwrap().get(0).unwrap();
    assert_eq!(first, spec.label(0));
}

#[test]
fn test_discretize_missing_column() {
    let df = create_titanic_dataframe();
    assert!(matches!(
        discretize_frame(&df, "Ticket", 4),
        Err(SurvivalError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_survival_by_bucket_ascending_levels() {
    let df = create_titanic_dataframe();
    let (table, spec) = survival_by_bucket(&df, "Survived", "Fare", 10).unwrap();

    assert_eq!(table.outcome, "Survived");
    assert_eq!(table.explanatory, "Fare");
    assert_eq!(table.levels, spec.labels());
    assert_eq!(table.grand_total(), 891);
    assert_eq!(table.row_totals(), vec![549, 342]);
    // Fares follow row order: 81 females who died, then the first 9 who survived
    assert_eq!(table.count(OutcomeClass::DidNotSurvive, &spec.label(0)), Some(81));
    assert_eq!(table.count(OutcomeClass::Survived, &spec.label(0)), Some(9));
}
