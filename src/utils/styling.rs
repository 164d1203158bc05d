//! Terminal styling for command output

use std::path::Path;
use std::time::Duration;

use console::{style, Emoji};

// Emoji with fallbacks for terminals that can't render them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static SHIP: Emoji<'_, '_> = Emoji("🚢 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        SHIP,
        style("TITANIC SURVIVAL PREDICTOR").cyan().bold()
    );
    println!(
        "    {}",
        style("Would a passenger have survived the Titanic?").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print the source of the data or model used by a command
pub fn print_source(label: &str, path: &Path) {
    println!(
        "    {} {:<10} {}",
        FOLDER,
        style(format!("{}:", label)).white().bold(),
        truncate_path(path, 60)
    );
}

pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("({:.2}s)", elapsed.as_secs_f64())).dim()
    );
}

/// Print where an export was written
pub fn print_saved(path: &Path) {
    println!(
        "    {} {} {}",
        SAVE,
        style("Saved to").dim(),
        truncate_path(path, 60)
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!("    {} {}", SHIP, style("Done!").green().bold());
    println!();
}

/// Print a styled count
pub fn print_count(description: &str, count: usize) {
    println!(
        "    {} {} {}",
        CHART,
        style(count).yellow().bold(),
        description
    );
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_string("data.csv", 20), "data.csv");
    }

    #[test]
    fn test_truncate_keeps_tail() {
        let s = "outputs/datasets/collection/titanic_passengers.csv";
        let t = truncate_string(s, 20);
        assert_eq!(t.chars().count(), 20);
        assert!(t.starts_with("..."));
        assert!(t.ends_with("passengers.csv"));
    }
}
