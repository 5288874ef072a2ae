//! lossmetric CLI - measure how faithfully lossy data was reconstructed
//!
//! This binary reads an original and a decompressed dataset and reports error
//! statistics, either computed in-process or by an external analysis program.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use lossmetric_cli::commands;
use lossmetric_cli::input::InputFormat;
use lossmetric_core::DType;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "LOSSMETRIC_LOG";

/// lossmetric - Lossy Reconstruction Metrics
#[derive(Parser)]
#[command(name = "lossmetric")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options describing how input files are read.
#[derive(clap::Args, Debug)]
struct FormatArgs {
    /// I/O backend used to read both files (posix, csv)
    #[arg(long, default_value = lossmetric_io::DEFAULT_IO_FORMAT)]
    io_format: String,

    /// Element type of raw files (float, double, int8, ..., uint64, byte)
    #[arg(long = "type", value_name = "TYPE")]
    dtype: Option<DType>,

    /// Extent of one dimension of raw files; repeat for each dimension
    #[arg(long = "dim", value_name = "N")]
    dims: Vec<usize>,
}

impl From<FormatArgs> for InputFormat {
    fn from(args: FormatArgs) -> Self {
        InputFormat {
            io_format: args.io_format,
            dtype: args.dtype,
            dims: args.dims,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute error statistics between an input and its decompressed form
    Stat {
        /// Path to the original data
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the decompressed data
        #[arg(short, long)]
        decompressed: PathBuf,

        #[command(flatten)]
        format: FormatArgs,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Run an external analysis program on an input and its decompressed form
    External {
        /// Command template; the protocol arguments are appended
        #[arg(short, long)]
        command: String,

        /// Path to the original data
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the decompressed data
        #[arg(short, long)]
        decompressed: PathBuf,

        #[command(flatten)]
        format: FormatArgs,

        /// Directory for the temporary files handed to the program
        #[arg(long, default_value = ".")]
        temp_dir: PathBuf,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// List registered io backends and metrics collectors
    Plugins {
        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Stat {
            input,
            decompressed,
            format,
            json,
        } => commands::stat::run(&input, &decompressed, &format.into(), json),
        Commands::External {
            command,
            input,
            decompressed,
            format,
            temp_dir,
            json,
        } => {
            let format = InputFormat::from(format);
            let args = commands::external::ExternalArgs {
                command: &command,
                input: &input,
                decompressed: &decompressed,
                format: &format,
                temp_dir: &temp_dir,
            };
            commands::external::run(&args, json)
        }
        Commands::Plugins { json } => commands::plugins::run(json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
