//! Subcommand runners

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::info;
use polars::prelude::DataFrame;

use super::args::{Cli, Commands};
use super::prompts::{prompt_category, prompt_number, prompt_pclass};
use crate::model::{evaluate, ArtifactStore};
use crate::pipeline::{
    age_bounds, bucket_counts, category_options, columns_with_missing, dataset_overview, fare_bounds, fit_bucket,
    predict_with_bundle, read_table, survival_by_bucket, test_many, validate_passenger_schema,
    HypothesisOptions, LiveRecord, PassengerDataset, AGE, FARE, PCLASS, SEX, SURVIVED,
};
use crate::report::{
    display_discretization, display_evaluation, display_feature_importances, display_hypothesis,
    display_overview, display_prediction, export_json, prediction_statement, DiscretizationExport,
    EvaluationExport, HypothesisExport, HypothesisExportEntry, PredictionExport,
};
use crate::utils::{
    create_spinner, finish_with_error, finish_with_success, print_count, print_info,
    print_saved, print_source, print_step_time, print_success, print_warning,
};

/// Live passenger attributes given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictInputs {
    pub sex: Option<String>,
    pub pclass: Option<u8>,
    pub fare: Option<f64>,
    pub age: Option<f64>,
}

impl PredictInputs {
    /// Names of the attributes that still need a value
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.sex.is_none() {
            missing.push(SEX);
        }
        if self.pclass.is_none() {
            missing.push(PCLASS);
        }
        if self.fare.is_none() {
            missing.push(FARE);
        }
        if self.age.is_none() {
            missing.push(AGE);
        }
        missing
    }

    /// The record to score, if every attribute is known
    pub fn to_record(&self) -> Option<LiveRecord> {
        Some(LiveRecord::passenger(
            self.sex.as_deref()?,
            self.pclass?,
            self.fare?,
            self.age?,
        ))
    }
}

/// Run the parsed command
pub fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Hypothesis {
            outcome,
            explanatory,
            alpha,
            yates,
        } => run_hypothesis(cli, outcome, explanatory, *alpha, *yates),
        Commands::Discretize {
            column,
            buckets,
            no_survival,
        } => run_discretize(cli, column, *buckets, *no_survival),
        Commands::Predict {
            model_version,
            sex,
            pclass,
            fare,
            age,
            no_prompt,
        } => {
            let inputs = PredictInputs {
                sex: sex.clone(),
                pclass: *pclass,
                fare: *fare,
                age: *age,
            };
            run_predict(cli, model_version, inputs, *no_prompt)
        }
        Commands::Evaluate { model_version } => run_evaluate(cli, model_version),
        Commands::Overview => run_overview(cli),
        Commands::Versions => run_versions(cli),
    }
}

fn load_dataset(dataset: &PassengerDataset) -> Result<std::sync::Arc<DataFrame>> {
    let start = Instant::now();
    let spinner = create_spinner("Loading passenger data...");
    match dataset.load() {
        Ok(df) => {
            finish_with_success(
                &spinner,
                &format!("Loaded {} passengers", df.height()),
            );
            print_step_time(start.elapsed());
            Ok(df)
        }
        Err(e) => {
            finish_with_error(&spinner, "Failed to load passenger data");
            Err(e).with_context(|| format!("Cannot use dataset {}", dataset.path().display()))
        }
    }
}

fn maybe_export<T: serde::Serialize>(cli: &Cli, source: &Path, result: &T) -> Result<()> {
    if let Some(path) = &cli.json {
        export_json(cli.command.name(), source, result, path)?;
        print_saved(path);
    }
    Ok(())
}

fn run_hypothesis(
    cli: &Cli,
    outcome: &str,
    explanatory: &[String],
    alpha: f64,
    yates: bool,
) -> Result<()> {
    print_source("Data", &cli.data);
    let dataset = PassengerDataset::new(&cli.data);
    let df = load_dataset(&dataset)?;

    let options = HypothesisOptions {
        continuity_correction: yates,
        ..Default::default()
    };

    let spinner = create_spinner("Running chi-squared tests...");
    let results = test_many(&df, outcome, explanatory, &options);
    finish_with_success(&spinner, "Tests complete");

    let mut tests = Vec::new();
    let mut failed = Vec::new();
    for (factor, result) in explanatory.iter().zip(results) {
        match result {
            Ok(result) => {
                display_hypothesis(&result, alpha);
                tests.push(HypothesisExportEntry {
                    explanatory: factor.clone(),
                    significant: result.is_significant(alpha),
                    result,
                });
            }
            Err(e) => {
                print_warning(&format!("{}: {}", factor, e));
                failed.push((factor.clone(), e.to_string()));
            }
        }
    }

    println!();
    let significant = tests.iter().filter(|t| t.significant).count();
    print_count(
        &format!("of {} factor(s) significant at alpha = {}", explanatory.len(), alpha),
        significant,
    );

    if tests.is_empty() {
        bail!("No hypothesis test could be run");
    }

    let export = HypothesisExport {
        outcome: outcome.to_string(),
        alpha,
        continuity_correction: yates,
        tests,
        failed,
    };
    maybe_export(cli, &cli.data, &export)
}

fn run_discretize(cli: &Cli, column: &str, buckets: usize, no_survival: bool) -> Result<()> {
    print_source("Data", &cli.data);
    let dataset = PassengerDataset::new(&cli.data);
    let df = load_dataset(&dataset)?;

    let source = df
        .column(column)
        .with_context(|| format!("Column '{}' not found in dataset", column))?;
    let spec = fit_bucket(source, buckets)?;
    let counts = bucket_counts(source, &spec)?;
    let survival = if no_survival {
        None
    } else {
        Some(survival_by_bucket(&df, SURVIVED, column, buckets)?.0)
    };

    display_discretization(&spec, &counts, survival.as_ref());

    let export = DiscretizationExport {
        labels: spec.labels(),
        spec,
        counts,
        survival,
    };
    maybe_export(cli, &cli.data, &export)
}

/// Fill in attributes missing from the command line by prompting,
/// with ranges derived from the passenger dataset.
fn complete_inputs(mut inputs: PredictInputs, df: &DataFrame) -> Result<LiveRecord> {
    if inputs.sex.is_none() {
        let options = category_options(df, SEX)?;
        inputs.sex = Some(prompt_category("Sex", &options)?);
    }
    let pclass = match inputs.pclass {
        Some(c) => c,
        None => prompt_pclass()?,
    };
    inputs.pclass = Some(pclass);
    if inputs.fare.is_none() {
        // Fare range follows the class just chosen
        let range = fare_bounds(df, Some(pclass))?;
        inputs.fare = Some(prompt_number("Fare", &range)?);
    }
    if inputs.age.is_none() {
        let range = age_bounds(df)?;
        inputs.age = Some(prompt_number("Age", &range)?);
    }

    inputs
        .to_record()
        .context("Passenger attributes are still incomplete")
}

fn run_predict(cli: &Cli, version: &str, inputs: PredictInputs, no_prompt: bool) -> Result<()> {
    let record = match inputs.to_record() {
        Some(record) => record,
        None if no_prompt => bail!(
            "Missing passenger attributes: {}",
            inputs.missing().join(", ")
        ),
        None => {
            print_source("Data", &cli.data);
            let dataset = PassengerDataset::new(&cli.data);
            let df = load_dataset(&dataset)?;
            complete_inputs(inputs, &df)?
        }
    };

    print_source("Models", &cli.artifacts);
    let store = ArtifactStore::new(&cli.artifacts);
    let spinner = create_spinner(&format!("Loading model {}...", version));
    let bundle = match store.load(version) {
        Ok(bundle) => {
            finish_with_success(&spinner, &format!("Model {} loaded", version));
            bundle
        }
        Err(e) => {
            finish_with_error(&spinner, &format!("Model {} unavailable", version));
            return Err(e.into());
        }
    };

    let result = predict_with_bundle(&record, &bundle)?;
    info!("Prediction with model {}: {:?}", version, result);
    display_prediction(&record, &result);

    let export = PredictionExport {
        version: version.to_string(),
        statement: prediction_statement(&result),
        record,
        prediction: result,
    };
    maybe_export(cli, &cli.artifacts, &export)
}

fn run_evaluate(cli: &Cli, version: &str) -> Result<()> {
    print_source("Models", &cli.artifacts);
    let store = ArtifactStore::new(&cli.artifacts);

    let spinner = create_spinner(&format!("Loading model {} and its train/test split...", version));
    let (bundle, split) = match store.load(version).and_then(|b| Ok((b, store.evaluation_split(version)?))) {
        Ok(loaded) => {
            finish_with_success(&spinner, &format!("Model {} loaded", version));
            loaded
        }
        Err(e) => {
            finish_with_error(&spinner, &format!("Model {} unavailable", version));
            return Err(e.into());
        }
    };

    print_info(&format!(
        "Model family: {} on {} feature(s)",
        bundle.classifier.family(),
        bundle.preparation.output_features().len()
    ));

    let train = evaluate(&bundle.classifier, &split.x_train, &split.y_train)?;
    let test = evaluate(&bundle.classifier, &split.x_test, &split.y_test)?;
    display_evaluation("Train Set", &train);
    display_evaluation("Test Set", &test);

    let importances = bundle.classifier.feature_importances();
    display_feature_importances(&importances);
    match store.feature_importance_image(version) {
        Ok(path) => print_info(&format!("Feature importance plot: {}", path.display())),
        Err(e) => print_warning(&e.to_string()),
    }

    let export = EvaluationExport {
        version: version.to_string(),
        model: bundle.classifier.family().to_string(),
        train,
        test,
        feature_importances: importances,
    };
    maybe_export(cli, &cli.artifacts, &export)
}

fn run_overview(cli: &Cli) -> Result<()> {
    print_source("Data", &cli.data);
    let spinner = create_spinner("Reading dataset...");
    let df = match read_table(&cli.data) {
        Ok(df) => {
            finish_with_success(&spinner, "Dataset read");
            df
        }
        Err(e) => {
            finish_with_error(&spinner, "Failed to read dataset");
            return Err(e.into());
        }
    };

    let overview = dataset_overview(&df)?;
    display_overview(&overview);
    println!();
    print_count(
        "column(s) with missing values",
        columns_with_missing(&overview.missing).len(),
    );

    println!();
    match validate_passenger_schema(&df, true) {
        Ok(()) => print_success("Dataset matches the passenger schema"),
        Err(e) => print_warning(&format!("Dataset does not match the passenger schema: {}", e)),
    }

    maybe_export(cli, &cli.data, &overview)
}

fn run_versions(cli: &Cli) -> Result<()> {
    print_source("Models", &cli.artifacts);
    let store = ArtifactStore::new(&cli.artifacts);
    let versions = store.available_versions()?;

    if versions.is_empty() {
        print_warning("No model versions published");
    } else {
        print_count("model version(s) published", versions.len());
        for v in &versions {
            println!("      • {}", v);
        }
    }

    maybe_export(cli, &cli.artifacts, &versions)
}
