//! Command line and stdout protocol spoken with external analysis programs.
//!
//! # Invocation
//!
//! ```text
//! <command template...> --api 1 --input PATH --decompressed PATH --type TYPE --dim N [--dim N ...]
//! ```
//!
//! # Output (api version 1)
//!
//! ```text
//! external:api=1
//! <name>=<number>
//! <name>=<number>
//! ```
//!
//! Each `<name>=<number>` line becomes the result `external:results:<name>`.
//! Standard error is captured verbatim and never parsed.

use std::path::Path;

use thiserror::Error;

use lossmetric_core::{Dataset, Options};

use super::process::{ExternalErrorCode, ProcessOutcome};

/// Protocol version passed as `--api` and accepted on stdout.
pub const API_VERSION: u64 = 1;

/// Prefix of the first stdout line.
pub const API_HEADER: &str = "external:api=";

/// Result key holding the runner error code.
pub const ERROR_CODE: &str = "external:error_code";

/// Result key holding the program's exit code.
pub const RETURN_CODE: &str = "external:return_code";

/// Result key holding the program's captured stderr.
pub const STDERR: &str = "external:stderr";

/// Prefix of every value reported by the program.
pub const RESULTS_PREFIX: &str = "external:results:";

/// Reasons stdout fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("output is empty, expected '{API_HEADER}<version>'")]
    MissingVersion,

    #[error("first line '{0}' is not '{API_HEADER}<version>'")]
    MalformedVersion(String),

    #[error("unsupported api version {0}")]
    UnsupportedVersion(u64),

    #[error("line {line}: expected <name>=<value>, found '{text}'")]
    MalformedLine { line: usize, text: String },

    #[error("line {line}: value '{value}' of '{name}' is not a number")]
    InvalidValue {
        line: usize,
        name: String,
        value: String,
    },
}

/// Builds the full argument vector for one run.
///
/// The command template is split on whitespace; its first token is the
/// program to execute.
pub fn build_arguments(
    command: &str,
    input: &Path,
    decompressed: &Path,
    data: &Dataset,
) -> Vec<String> {
    let mut argv: Vec<String> = command.split_whitespace().map(String::from).collect();
    argv.push("--api".to_string());
    argv.push(API_VERSION.to_string());
    argv.push("--input".to_string());
    argv.push(input.to_string_lossy().into_owned());
    argv.push("--decompressed".to_string());
    argv.push(decompressed.to_string_lossy().into_owned());
    argv.push("--type".to_string());
    argv.push(data.dtype().name().to_string());
    for dim in data.dims() {
        argv.push("--dim".to_string());
        argv.push(dim.to_string());
    }
    argv
}

/// Parses the program's stdout into a result set.
pub fn parse_output(outcome: &ProcessOutcome) -> Result<Options, ProtocolError> {
    let mut lines = outcome.stdout.lines();
    let header = lines.next().ok_or(ProtocolError::MissingVersion)?;
    let version = header
        .strip_prefix(API_HEADER)
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ProtocolError::MalformedVersion(header.to_string()))?;

    match version {
        1 => parse_v1(lines, outcome),
        other => Err(ProtocolError::UnsupportedVersion(other)),
    }
}

fn parse_v1<'a>(
    lines: impl Iterator<Item = &'a str>,
    outcome: &ProcessOutcome,
) -> Result<Options, ProtocolError> {
    let mut results = Options::new();

    // Line numbers are 1-based and the header is line 1.
    for (line, text) in (2..).zip(lines) {
        let (name, value) = text
            .split_once('=')
            .ok_or_else(|| ProtocolError::MalformedLine {
                line,
                text: text.to_string(),
            })?;
        let parsed = value
            .trim()
            .parse::<f64>()
            .map_err(|_| ProtocolError::InvalidValue {
                line,
                name: name.to_string(),
                value: value.to_string(),
            })?;
        results.set(format!("{}{}", RESULTS_PREFIX, name), parsed);
    }

    results.set(STDERR, outcome.stderr.clone());
    results.set(RETURN_CODE, outcome.return_code);
    // Mirrors the return code rather than the runner code.
    results.set(ERROR_CODE, outcome.return_code);
    Ok(results)
}

/// Result set reported when a run fails before or while parsing.
pub fn error_results(error_code: ExternalErrorCode, return_code: i32, stderr: &str) -> Options {
    Options::new()
        .with(ERROR_CODE, error_code.code())
        .with(RETURN_CODE, return_code)
        .with(STDERR, stderr)
}
