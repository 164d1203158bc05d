//! Terminal tables for analysis results

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{BinSpec, ContingencyTable, DatasetOverview, HypothesisResult, OutcomeClass};

fn new_table(header: Vec<String>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn number(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
}

/// Format a p-value, switching to scientific notation for tiny values
pub fn format_p_value(p: f64) -> String {
    if p < 1e-4 {
        format!("{:.3e}", p)
    } else {
        format!("{:.4}", p)
    }
}

fn level_header(first: &str, levels: &[String]) -> Vec<String> {
    let mut header = vec![first.to_string()];
    header.extend(levels.iter().cloned());
    header.push("Total".to_string());
    header
}

/// Observed counts with margins and a survival-rate row
pub fn observed_table(table: &ContingencyTable) -> Table {
    let mut out = new_table(level_header(&table.explanatory, &table.levels));

    for (class, row) in OutcomeClass::ALL.iter().zip(&table.observed) {
        let mut cells = vec![Cell::new(class.label())];
        cells.extend(row.iter().map(number));
        cells.push(number(row.iter().sum::<u64>()));
        out.add_row(cells);
    }

    let mut totals = vec![Cell::new("Total").add_attribute(Attribute::Bold)];
    totals.extend(table.column_totals().into_iter().map(number));
    totals.push(number(table.grand_total()).add_attribute(Attribute::Bold));
    out.add_row(totals);

    let mut rates = vec![Cell::new("Survival rate").fg(Color::Cyan)];
    rates.extend(
        table
            .survival_rates()
            .into_iter()
            .map(|(_, rate)| number(format!("{:.1}%", rate * 100.0)).fg(Color::Cyan)),
    );
    rates.push(Cell::new(""));
    out.add_row(rates);

    out
}

/// Expected counts under independence, two decimal places
pub fn expected_table(result: &HypothesisResult) -> Table {
    let expected = &result.expected;
    let mut out = new_table(level_header(&result.contingency.explanatory, &expected.levels));

    for (class, row) in OutcomeClass::ALL.iter().zip(&expected.expected) {
        let mut cells = vec![Cell::new(class.label())];
        cells.extend(row.iter().map(|e| {
            let cell = number(format!("{:.2}", e));
            if *e < 5.0 {
                cell.fg(Color::Yellow)
            } else {
                cell
            }
        }));
        cells.push(number(format!("{:.2}", row.iter().sum::<f64>())));
        out.add_row(cells);
    }

    let mut totals = vec![Cell::new("Total").add_attribute(Attribute::Bold)];
    totals.extend(
        expected
            .column_totals()
            .into_iter()
            .map(|t| number(format!("{:.2}", t))),
    );
    totals.push(number(format!("{:.2}", expected.grand_total())));
    out.add_row(totals);

    out
}

/// One-line conclusion of a test at significance level `alpha`
pub fn interpretation(result: &HypothesisResult, alpha: f64) -> String {
    let factor = &result.contingency.explanatory;
    if result.is_significant(alpha) {
        format!(
            "Reject independence: survival depends on {} (p < {})",
            factor, alpha
        )
    } else {
        format!(
            "No evidence that survival depends on {} (p >= {})",
            factor, alpha
        )
    }
}

/// Print the full report of one independence test
pub fn display_hypothesis(result: &HypothesisResult, alpha: f64) {
    print_section(
        "📋",
        &format!(
            "{} vs {}",
            result.contingency.outcome.to_uppercase(),
            result.contingency.explanatory.to_uppercase()
        ),
    );

    println!("    {}", style("Observed").dim());
    print_indented(&observed_table(&result.contingency));
    println!();
    println!("    {}", style("Expected under independence").dim());
    print_indented(&expected_table(result));
    println!();

    let mut stats = new_table(vec!["Statistic".into(), "Value".into()]);
    stats.add_row(vec![
        Cell::new("Chi-square"),
        number(format!("{:.4}", result.chi_square)),
    ]);
    stats.add_row(vec![
        Cell::new("Degrees of freedom"),
        number(result.degrees_of_freedom),
    ]);
    let significant = result.is_significant(alpha);
    stats.add_row(vec![
        Cell::new("p-value"),
        number(format_p_value(result.p_value))
            .fg(if significant { Color::Green } else { Color::White })
            .add_attribute(Attribute::Bold),
    ]);
    if result.continuity_corrected {
        stats.add_row(vec![Cell::new("Yates correction"), number("applied")]);
    }
    if result.small_expected_cells > 0 {
        stats.add_row(vec![
            Cell::new("Expected cells < 5"),
            number(result.small_expected_cells).fg(Color::Yellow),
        ]);
    }
    print_indented(&stats);

    println!();
    let verdict = interpretation(result, alpha);
    if significant {
        println!("    {} {}", style("✓").green().bold(), style(verdict).green());
    } else {
        println!("    {} {}", style("•").dim(), verdict);
    }
}

/// Bucket labels with their populations
pub fn bucket_table(spec: &BinSpec, counts: &[usize]) -> Table {
    let total: usize = counts.iter().sum();
    let mut out = new_table(vec![
        "#".into(),
        format!("{} bucket", spec.column),
        "Count".into(),
        "Share".into(),
    ]);

    for (i, (label, count)) in spec.labels().into_iter().zip(counts).enumerate() {
        let share = if total > 0 {
            *count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        out.add_row(vec![
            number(i + 1),
            Cell::new(label),
            number(count),
            number(format!("{:.1}%", share)),
        ]);
    }
    out
}

/// Print the buckets of a discretized column and, when available, survival per bucket
pub fn display_discretization(spec: &BinSpec, counts: &[usize], survival: Option<&ContingencyTable>) {
    print_section(
        "📊",
        &format!("{} IN {} BUCKETS", spec.column.to_uppercase(), spec.bucket_count()),
    );
    print_indented(&bucket_table(spec, counts));

    if let Some(table) = survival {
        println!();
        println!("    {}", style("Survival by bucket").dim());
        print_indented(&observed_table(table));
    }
}

/// Print the shape and missingness of a dataset
pub fn display_overview(overview: &DatasetOverview) {
    print_section("📋", "DATASET OVERVIEW");

    let mut shape = new_table(vec!["Metric".into(), "Value".into()]);
    shape.add_row(vec![Cell::new("Rows"), number(overview.rows)]);
    shape.add_row(vec![Cell::new("Columns"), number(overview.columns)]);
    shape.add_row(vec![
        Cell::new("Estimated memory"),
        number(format!("{:.2} MB", overview.estimated_mb)),
    ]);
    print_indented(&shape);

    println!();
    let mut missing = new_table(vec!["Column".into(), "Missing".into()]);
    for (name, ratio) in &overview.missing {
        let color = if *ratio > 0.3 {
            Color::Red
        } else if *ratio > 0.0 {
            Color::Yellow
        } else {
            Color::Green
        };
        missing.add_row(vec![
            Cell::new(name),
            number(format!("{:.1}%", ratio * 100.0)).fg(color),
        ]);
    }
    print_indented(&missing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{chi_square, HypothesisOptions};

    fn sex_table() -> ContingencyTable {
        ContingencyTable {
            outcome: "Survived".into(),
            explanatory: "Sex".into(),
            levels: vec!["female".into(), "male".into()],
            observed: vec![vec![81, 468], vec![233, 109]],
        }
    }

    #[test]
    fn test_observed_table_has_margins() {
        let rendered = observed_table(&sex_table()).to_string();
        assert!(rendered.contains("Did Not Survive"));
        assert!(rendered.contains("549"));
        assert!(rendered.contains("891"));
        assert!(rendered.contains("74.2%"));
    }

    #[test]
    fn test_expected_table_two_decimals() {
        let result = chi_square(&sex_table(), &HypothesisOptions::default()).unwrap();
        let rendered = expected_table(&result).to_string();
        // 549 * 314 / 891
        assert!(rendered.contains("193.47"));
    }

    #[test]
    fn test_interpretation() {
        let result = chi_square(&sex_table(), &HypothesisOptions::default()).unwrap();
        assert!(interpretation(&result, 0.05).starts_with("Reject independence"));
    }

    #[test]
    fn test_format_p_value() {
        assert_eq!(format_p_value(0.5), "0.5000");
        assert!(format_p_value(1e-10).contains('e'));
    }

    #[test]
    fn test_bucket_table_rows() {
        let spec = BinSpec {
            column: "Fare".into(),
            boundaries: vec![10.0],
        };
        let rendered = bucket_table(&spec, &[3, 1]).to_string();
        assert!(rendered.contains("< 10"));
        assert!(rendered.contains("> 10"));
        assert!(rendered.contains("75.0%"));
    }
}
