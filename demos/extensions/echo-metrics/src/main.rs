//! Echo Metrics
//!
//! A reference external analysis program for the `external` metrics
//! collector. It reads the raw files it is handed and prints a few error
//! metrics using protocol version 1.
//!
//! # Usage
//!
//! ```bash
//! lossmetric external --command echo-metrics -i a.bin -d b.bin --type float --dim 64 --dim 64
//! ```
//!
//! The collector invokes it as:
//!
//! ```bash
//! echo-metrics --api 1 --input IN --decompressed OUT --type float --dim 64 --dim 64
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use lossmetric_core::{DType, Dataset};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "echo-metrics")]
#[command(about = "Reference lossmetric external analysis program")]
struct Args {
    /// Protocol version requested by the caller
    #[arg(long)]
    api: u32,

    /// Path to the original data
    #[arg(long)]
    input: PathBuf,

    /// Path to the decompressed data
    #[arg(long)]
    decompressed: PathBuf,

    /// Element type name
    #[arg(long = "type")]
    dtype: DType,

    /// Dimension extents in order
    #[arg(long = "dim")]
    dims: Vec<usize>,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let args = Args::parse();

    if args.api != 1 {
        eprintln!("unsupported api version {}", args.api);
        return ExitCode::from(2);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn load(path: &Path, args: &Args) -> Result<Dataset> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Dataset::from_ne_bytes(args.dtype, args.dims.clone(), &bytes)
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn run(args: &Args) -> Result<()> {
    let original = load(&args.input, args)?;
    let decompressed = load(&args.decompressed, args)?;

    let n = original.num_elements();
    let mut max_abs_error = 0.0f64;
    let mut squared = 0.0f64;
    for (a, b) in original.values_f64().zip(decompressed.values_f64()) {
        let diff = (a - b).abs();
        max_abs_error = max_abs_error.max(diff);
        squared += diff * diff;
    }
    let mse = if n == 0 { 0.0 } else { squared / n as f64 };

    println!("external:api=1");
    println!("elements={}", n);
    println!("max_abs_error={}", max_abs_error);
    println!("mse={}", mse);
    Ok(())
}
