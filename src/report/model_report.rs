//! Terminal output for predictions and model evaluation

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::model::{ClassificationReport, LABEL_MAP};
use crate::pipeline::{LiveRecord, PredictionResult, SurvivalLabel};

/// Sentence reported to the user for a prediction
pub fn prediction_statement(result: &PredictionResult) -> String {
    format!(
        "There is {:.1}% probability that this passenger {}.",
        result.probability,
        result.phrase()
    )
}

/// Print the record that was scored and the prediction
pub fn display_prediction(record: &LiveRecord, result: &PredictionResult) {
    println!();
    println!(
        "    {} {}",
        style("🎯").cyan(),
        style("PREDICTION").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());

    let mut inputs = Table::new();
    inputs.load_preset(UTF8_FULL_CONDENSED);
    inputs.set_header(vec![
        Cell::new("Feature").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    for (name, value) in record.iter() {
        inputs.add_row(vec![Cell::new(name), Cell::new(value.to_string())]);
    }
    for line in inputs.to_string().lines() {
        println!("    {}", line);
    }

    println!();
    let statement = prediction_statement(result);
    match result.label {
        SurvivalLabel::Survived => println!("    {}", style(statement).green().bold()),
        SurvivalLabel::DidNotSurvive => println!("    {}", style(statement).red().bold()),
    }
}

/// Confusion matrix, rows actual and columns predicted
pub fn confusion_table(report: &ClassificationReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Actual \\ Predicted").add_attribute(Attribute::Bold),
        Cell::new(LABEL_MAP[0]).add_attribute(Attribute::Bold),
        Cell::new(LABEL_MAP[1]).add_attribute(Attribute::Bold),
    ]);
    for (actual, row) in report.confusion.iter().enumerate() {
        let cells: Vec<Cell> = std::iter::once(Cell::new(LABEL_MAP[actual]))
            .chain(row.iter().enumerate().map(|(predicted, count)| {
                let cell = Cell::new(count).set_alignment(CellAlignment::Right);
                if predicted == actual {
                    cell.fg(Color::Green)
                } else {
                    cell
                }
            }))
            .collect();
        table.add_row(cells);
    }
    table
}

/// Per-class precision, recall, F1 and support
pub fn metrics_table(report: &ClassificationReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        ["Class", "Precision", "Recall", "F1", "Support"]
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    for class in &report.classes {
        table.add_row(vec![
            Cell::new(&class.label),
            Cell::new(format!("{:.2}", class.precision)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", class.recall)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", class.f1)).set_alignment(CellAlignment::Right),
            Cell::new(class.support).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Accuracy").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(format!("{:.2}", report.accuracy))
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
        Cell::new(report.classes.iter().map(|c| c.support).sum::<u64>())
            .set_alignment(CellAlignment::Right),
    ]);
    table
}

/// Print the report for one split ("Train Set" or "Test Set")
pub fn display_evaluation(split: &str, report: &ClassificationReport) {
    println!();
    println!(
        "    {} {}",
        style("📈").cyan(),
        style(split.to_uppercase()).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    for line in confusion_table(report).to_string().lines() {
        println!("    {}", line);
    }
    println!();
    for line in metrics_table(report).to_string().lines() {
        println!("    {}", line);
    }
}

/// Print feature importances as a bar chart, highest first
pub fn display_feature_importances(importances: &[(String, f64)]) {
    println!();
    println!(
        "    {} {}",
        style("🔎").cyan(),
        style("FEATURE IMPORTANCE").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());

    let width = importances.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    for (name, value) in importances {
        let bar = "█".repeat((value * 40.0).round() as usize);
        println!(
            "    {:<width$}  {} {}",
            name,
            style(bar).cyan(),
            style(format!("{:.3}", value)).dim(),
            width = width
        );
    }
}
