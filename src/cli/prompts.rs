//! Interactive prompts for live passenger attributes using dialoguer

use anyhow::Result;
use dialoguer::{Input, Select};

use crate::pipeline::NumericRange;

/// Passenger classes offered by the class prompt
pub const PCLASS_OPTIONS: [u8; 3] = [1, 2, 3];

/// Choose one of the categories seen in the dataset
pub fn prompt_category(label: &str, options: &[String]) -> Result<String> {
    let index = Select::new()
        .with_prompt(label)
        .items(options)
        .default(0)
        .interact()?;
    Ok(options[index].clone())
}

/// Choose a passenger class
pub fn prompt_pclass() -> Result<u8> {
    let items: Vec<String> = PCLASS_OPTIONS.iter().map(|c| c.to_string()).collect();
    let index = Select::new()
        .with_prompt("Passenger class (Pclass)")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(PCLASS_OPTIONS[index])
}

/// Enter a number within `range`, defaulting to its suggested value
pub fn prompt_number(label: &str, range: &NumericRange) -> Result<f64> {
    let range = *range;
    let value = Input::<f64>::new()
        .with_prompt(format!("{} ({} to {})", label, range.min, range.max))
        .default(range.default)
        .validate_with(move |v: &f64| -> std::result::Result<(), String> {
            if range.contains(*v) {
                Ok(())
            } else {
                Err(format!("enter a value between {} and {}", range.min, range.max))
            }
        })
        .interact_text()?;
    Ok(value)
}
