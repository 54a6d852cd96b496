use anyhow::{Context, Result};
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;

use crate::OutputFormat;

/// Read and parse a JSON file
pub fn load_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path))
}

/// Print `value` as JSON for the json/compact formats.
///
/// Returns `false` for pretty output, which each command renders itself.
pub fn print_structured<T: Serialize>(value: &T, output: &OutputFormat) -> Result<bool> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Compact => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Pretty => return Ok(false),
    }
    Ok(true)
}

/// Percentage with color by magnitude
pub fn percent(value: f64) -> colored::ColoredString {
    let text = format!("{:.0}%", value);
    if value >= 50.0 {
        text.green().bold()
    } else if value > 0.0 {
        text.yellow()
    } else {
        text.bright_black()
    }
}
