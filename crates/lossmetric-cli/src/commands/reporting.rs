//! Shared result printing.

use anyhow::Result;
use colored::Colorize;

use lossmetric_core::{OptionValue, Options};

/// Renders a result set as pretty JSON.
///
/// Placeholders become `null`. Non-finite doubles become `"inf"`, `"-inf"`
/// or `"NaN"`.
pub fn render_json(results: &Options) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Prints a result set as pretty JSON.
pub(super) fn print_json(results: &Options) -> Result<()> {
    println!("{}", render_json(results)?);
    Ok(())
}

/// Prints a result set as an aligned, colored key/value listing.
pub(super) fn print_human(title: &str, results: &Options) {
    println!("{}", title.cyan().bold());
    let width = results.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in results.iter() {
        let rendered = match value {
            OptionValue::String(Some(s)) if s.is_empty() => "\"\"".dimmed().to_string(),
            OptionValue::String(Some(s)) => s.trim_end().to_string(),
            v if !v.is_set() => v.to_string().dimmed().to_string(),
            v => v.to_string(),
        };
        let key = format!("{:width$}", key, width = width);
        println!("  {}  {}", key.dimmed(), rendered);
    }
}
