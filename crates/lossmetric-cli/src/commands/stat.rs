//! Stat command implementation
//!
//! Computes streaming error statistics between an input file and its
//! decompressed counterpart.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use lossmetric_core::MetricsPlugin;
use lossmetric_metrics::ErrorStat;

use super::reporting;
use crate::input::{self, InputFormat};

/// Run the stat command
///
/// # Arguments
/// * `input` - Path to the original data
/// * `decompressed` - Path to the reconstructed data
/// * `format` - How both files are read
/// * `json_output` - Whether to output machine-readable JSON
pub fn run(
    input: &Path,
    decompressed: &Path,
    format: &InputFormat,
    json_output: bool,
) -> Result<ExitCode> {
    let (original, reconstructed) = input::load_pair(input, decompressed, format)?;
    if original.num_elements() != reconstructed.num_elements() {
        anyhow::bail!(
            "Element counts differ: {} in input, {} in decompressed",
            original.num_elements(),
            reconstructed.num_elements()
        );
    }

    let mut stat = ErrorStat::new();
    stat.begin(&original);
    stat.end(&original, &reconstructed, 0);
    let results = stat.results();

    if json_output {
        reporting::print_json(&results)?;
    } else {
        println!("{} {}", "Input:".dimmed(), input.display());
        println!("{} {}", "Decompressed:".dimmed(), decompressed.display());
        println!(
            "{} {} x {:?}",
            "Data:".dimmed(),
            original.dtype(),
            original.dims()
        );
        println!();
        reporting::print_human("Error statistics:", &results);
    }

    Ok(ExitCode::SUCCESS)
}
