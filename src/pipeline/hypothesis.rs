//! Chi-squared test of independence between survival and a categorical factor
//!
//! Rows are the two outcome classes, columns the observed levels of the
//! explanatory variable. Rows with a null outcome or a null factor value are
//! left out of the table.

use log::{debug, warn};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use super::target::outcome_values;
use crate::error::{Result, SurvivalError};

/// Cells with an expected count below this trigger a small-sample warning
const DEFAULT_SMALL_EXPECTED: f64 = 5.0;

/// The two rows of every contingency table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeClass {
    DidNotSurvive,
    Survived,
}

impl OutcomeClass {
    pub const ALL: [OutcomeClass; 2] = [OutcomeClass::DidNotSurvive, OutcomeClass::Survived];

    pub fn label(&self) -> &'static str {
        match self {
            OutcomeClass::DidNotSurvive => "Did Not Survive",
            OutcomeClass::Survived => "Survived",
        }
    }
}

/// How the columns of a contingency table are ordered
#[derive(Debug, Clone, PartialEq)]
pub enum LevelOrder {
    /// Numeric order when every level parses as a number, else lexicographic
    Natural,
    /// Exactly this order; unlisted levels are an error
    Given(Vec<String>),
}

/// Observed counts: outcome class x factor level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    pub outcome: String,
    pub explanatory: String,
    pub levels: Vec<String>,
    /// `observed[row][level]`, row 0 = did not survive, row 1 = survived
    pub observed: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn row_totals(&self) -> Vec<u64> {
        self.observed.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<u64> {
        (0..self.levels.len())
            .map(|j| self.observed.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.row_totals().iter().sum()
    }

    /// Observed count for an outcome class and a level name
    pub fn count(&self, class: OutcomeClass, level: &str) -> Option<u64> {
        let j = self.levels.iter().position(|l| l == level)?;
        Some(self.observed[class as usize][j])
    }

    /// Share of each level that survived
    pub fn survival_rates(&self) -> Vec<(String, f64)> {
        self.levels
            .iter()
            .zip(self.column_totals())
            .enumerate()
            .map(|(j, (level, total))| {
                let survived = self.observed[OutcomeClass::Survived as usize][j];
                (level.clone(), survived as f64 / total as f64)
            })
            .collect()
    }

    /// Counts expected if outcome and factor were independent.
    pub fn expected(&self) -> Result<ExpectedTable> {
        let rows = self.row_totals();
        let cols = self.column_totals();
        let n = self.grand_total() as f64;

        if let Some(class) = OutcomeClass::ALL.iter().find(|c| rows[**c as usize] == 0) {
            debug!("Outcome class '{}' has no members", class.label());
            return Err(SurvivalError::InsufficientVariation {
                column: self.outcome.clone(),
                levels: rows.iter().filter(|r| **r > 0).count(),
            });
        }

        let expected = rows
            .iter()
            .map(|r| cols.iter().map(|c| *r as f64 * *c as f64 / n).collect())
            .collect();

        Ok(ExpectedTable {
            levels: self.levels.clone(),
            expected,
        })
    }
}

/// Expected counts under the independence hypothesis, same shape as the observed table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedTable {
    pub levels: Vec<String>,
    pub expected: Vec<Vec<f64>>,
}

impl ExpectedTable {
    pub fn row_totals(&self) -> Vec<f64> {
        self.expected.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<f64> {
        (0..self.levels.len())
            .map(|j| self.expected.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> f64 {
        self.row_totals().iter().sum()
    }
}

/// Tuning of the chi-squared computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HypothesisOptions {
    /// Apply Yates' continuity correction to 2x2 tables
    pub continuity_correction: bool,
    pub small_expected_threshold: f64,
}

impl Default for HypothesisOptions {
    fn default() -> Self {
        Self {
            continuity_correction: false,
            small_expected_threshold: DEFAULT_SMALL_EXPECTED,
        }
    }
}

/// Outcome of one independence test
#[derive(Debug, Clone, Serialize)]
pub struct HypothesisResult {
    pub contingency: ContingencyTable,
    pub expected: ExpectedTable,
    pub chi_square: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
    /// Expected cells below the small-sample threshold
    pub small_expected_cells: usize,
    pub continuity_corrected: bool,
}

impl HypothesisResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

fn sort_levels(levels: &mut [String]) {
    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if numeric.is_some() {
        levels.sort_by(|a, b| {
            let (x, y) = (a.parse::<f64>().unwrap_or(0.0), b.parse::<f64>().unwrap_or(0.0));
            x.total_cmp(&y)
        });
    } else {
        levels.sort();
    }
}

/// Cross-tabulate outcome classes against factor values.
pub fn build_contingency(
    outcome: &str,
    explanatory: &str,
    outcomes: &[Option<u8>],
    values: &[Option<String>],
    order: LevelOrder,
) -> Result<ContingencyTable> {
    let pairs: Vec<(u8, &str)> = outcomes
        .iter()
        .zip(values)
        .filter_map(|(o, v)| Some(((*o)?, v.as_deref()?)))
        .collect();

    let levels: Vec<String> = match order {
        LevelOrder::Natural => {
            let mut levels: Vec<String> = pairs.iter().map(|(_, v)| v.to_string()).collect();
            sort_levels(&mut levels);
            levels.dedup();
            levels
        }
        LevelOrder::Given(given) => {
            if let Some((_, v)) = pairs.iter().find(|(_, v)| !given.iter().any(|g| g == v)) {
                return Err(SurvivalError::schema(
                    explanatory,
                    format!("level '{}' is not among the given levels", v),
                ));
            }
            given
                .into_iter()
                .filter(|g| pairs.iter().any(|(_, v)| v == g))
                .collect()
        }
    };

    if levels.len() < 2 {
        return Err(SurvivalError::InsufficientVariation {
            column: explanatory.to_string(),
            levels: levels.len(),
        });
    }

    let mut observed = vec![vec![0u64; levels.len()]; 2];
    for (o, v) in &pairs {
        // Level lookup cannot fail: levels were collected from these pairs
        if let Some(j) = levels.iter().position(|l| l == v) {
            observed[*o as usize][j] += 1;
        }
    }

    Ok(ContingencyTable {
        outcome: outcome.to_string(),
        explanatory: explanatory.to_string(),
        levels,
        observed,
    })
}

/// Cross-tabulate two columns of a dataset.
pub fn contingency_table(df: &DataFrame, outcome: &str, explanatory: &str) -> Result<ContingencyTable> {
    let outcomes = outcome_values(df, outcome)?;
    let column = df
        .column(explanatory)
        .map_err(|_| SurvivalError::schema(explanatory, "column not found"))?;
    let values: Vec<Option<String>> = column
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();

    build_contingency(outcome, explanatory, &outcomes, &values, LevelOrder::Natural)
}

/// Pearson's chi-squared statistic over a contingency table.
pub fn chi_square(table: &ContingencyTable, options: &HypothesisOptions) -> Result<HypothesisResult> {
    let expected = table.expected()?;
    let degrees_of_freedom = (table.observed.len() - 1) * (table.levels.len() - 1);
    let corrected = options.continuity_correction && degrees_of_freedom == 1;

    let mut statistic = 0.0;
    let mut small_expected_cells = 0;
    for (obs_row, exp_row) in table.observed.iter().zip(&expected.expected) {
        for (o, e) in obs_row.iter().zip(exp_row) {
            if *e <= 0.0 {
                return Err(SurvivalError::InsufficientVariation {
                    column: table.explanatory.clone(),
                    levels: table.levels.len(),
                });
            }
            if *e < options.small_expected_threshold {
                small_expected_cells += 1;
            }
            let mut diff = (*o as f64 - e).abs();
            if corrected {
                diff = (diff - 0.5).max(0.0);
            }
            statistic += diff * diff / e;
        }
    }

    let distribution = ChiSquared::new(degrees_of_freedom as f64).map_err(|_| {
        SurvivalError::InsufficientVariation {
            column: table.explanatory.clone(),
            levels: table.levels.len(),
        }
    })?;
    let p_value = distribution.sf(statistic);

    if small_expected_cells > 0 {
        warn!(
            "{} expected cell(s) below {} for '{}'; the chi-squared approximation may be unreliable",
            small_expected_cells, options.small_expected_threshold, table.explanatory
        );
    }

    debug!(
        "chi2({}) = {:.4}, p = {:.4e} for '{}' vs '{}'",
        degrees_of_freedom, statistic, p_value, table.outcome, table.explanatory
    );

    Ok(HypothesisResult {
        contingency: table.clone(),
        expected,
        chi_square: statistic,
        p_value,
        degrees_of_freedom,
        small_expected_cells,
        continuity_corrected: corrected,
    })
}

/// Test whether `outcome` is independent of `explanatory`.
pub fn test_independence(df: &DataFrame, outcome: &str, explanatory: &str) -> Result<HypothesisResult> {
    test_independence_with(df, outcome, explanatory, &HypothesisOptions::default())
}

pub fn test_independence_with(
    df: &DataFrame,
    outcome: &str,
    explanatory: &str,
    options: &HypothesisOptions,
) -> Result<HypothesisResult> {
    let table = contingency_table(df, outcome, explanatory)?;
    chi_square(&table, options)
}

/// Run independent tests for several factors in parallel, in input order.
pub fn test_many(
    df: &DataFrame,
    outcome: &str,
    explanatory: &[String],
    options: &HypothesisOptions,
) -> Vec<Result<HypothesisResult>> {
    explanatory
        .par_iter()
        .map(|col| test_independence_with(df, outcome, col, options))
        .collect()
}
