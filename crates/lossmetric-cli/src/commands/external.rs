//! External command implementation
//!
//! Runs an external analysis program on an input file and its decompressed
//! counterpart and reports the values it prints.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use lossmetric_core::{MetricsPlugin, Options};
use lossmetric_metrics::external::ERROR_CODE;
use lossmetric_metrics::{ExternalConfig, ExternalMetrics, EXTERNAL_COMMAND, EXTERNAL_IO_FORMAT};

use super::reporting;
use crate::input::{self, InputFormat};

/// Arguments of the external command.
#[derive(Debug, Clone)]
pub struct ExternalArgs<'a> {
    pub command: &'a str,
    pub input: &'a Path,
    pub decompressed: &'a Path,
    pub format: &'a InputFormat,
    pub temp_dir: &'a Path,
}

/// Run the external command
///
/// # Returns
/// Exit code: 0 if the program ran and its output parsed, 1 otherwise
pub fn run(args: &ExternalArgs<'_>, json_output: bool) -> Result<ExitCode> {
    let (original, reconstructed) = input::load_pair(args.input, args.decompressed, args.format)?;

    let config = ExternalConfig::default().temp_dir(args.temp_dir);
    let mut metrics = ExternalMetrics::with_config(config);
    metrics.set_options(
        &Options::new()
            .with(EXTERNAL_COMMAND, args.command)
            .with(EXTERNAL_IO_FORMAT, args.format.io_format.as_str()),
    )?;

    metrics.begin(&original);
    metrics.end(&original, &reconstructed, 0);
    let results = metrics.results();
    let error_code = results.get::<i32>(ERROR_CODE).unwrap_or(0);

    if json_output {
        reporting::print_json(&results)?;
    } else {
        println!("{} {}", "Command:".dimmed(), args.command);
        println!();
        reporting::print_human("External results:", &results);
        if error_code != 0 {
            println!(
                "\n{} external:error_code = {}",
                "Run failed:".red().bold(),
                error_code
            );
        }
    }

    if error_code != 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
