//! Plugins command implementation

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::process::ExitCode;

/// List the registered io and metrics plugins.
pub fn run(json_output: bool) -> Result<ExitCode> {
    let io = lossmetric_io::builtin_registry();
    let metrics = lossmetric_metrics::builtin_registry();

    if json_output {
        let output = json!({
            "io": io.names().collect::<Vec<_>>(),
            "metrics": metrics.names().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "I/O backends:".cyan().bold());
    for name in io.names() {
        let plugin = io.build(name)?;
        println!("  {} {}", name.green(), plugin.version().dimmed());
    }
    println!("{}", "Metrics:".cyan().bold());
    for name in metrics.names() {
        println!("  {}", name.green());
    }

    Ok(ExitCode::SUCCESS)
}
