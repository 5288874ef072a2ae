//! Metrics computed by an external analysis program.
//!
//! [`ExternalMetrics`] serializes the original and reconstructed datasets to
//! temporary files, runs a configured command on them, and parses the values
//! the command prints. See [`protocol`] for the command line and output
//! format.

pub mod process;
pub mod protocol;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use lossmetric_core::{
    Dataset, IoError, IoPlugin, IoRegistry, MetricsPlugin, OptionType, Options, PluginError,
    IO_PATH,
};

pub use process::{
    CommandRunner, ExternalErrorCode, ProcessOutcome, SystemCommandRunner, EXEC_FAILURE_STATUS,
};
pub use protocol::{ProtocolError, ERROR_CODE, RESULTS_PREFIX, RETURN_CODE, STDERR};

/// Option key holding the command template.
pub const EXTERNAL_COMMAND: &str = "external:command";

/// Option key naming the I/O backend used for the temporary files.
pub const EXTERNAL_IO_FORMAT: &str = "external:io_format";

const INPUT_PREFIX: &str = ".lossmetricin";
const DECOMPRESSED_PREFIX: &str = ".lossmetricout";
const RANDOM_SUFFIX_LEN: usize = 6;

/// Configuration for [`ExternalMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalConfig {
    /// Directory the temporary dataset files are created in.
    pub temp_dir: PathBuf,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("."),
        }
    }
}

impl ExternalConfig {
    /// Sets the temporary file directory.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

/// Metrics collector delegating to an external program.
pub struct ExternalMetrics {
    command: String,
    io_format: String,
    io: Box<dyn IoPlugin>,
    io_registry: IoRegistry,
    runner: Arc<dyn CommandRunner>,
    config: ExternalConfig,
    input_data: Dataset,
    results: Options,
}

impl ExternalMetrics {
    /// Registered name of this collector.
    pub const NAME: &'static str = "external";

    /// Creates a collector with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ExternalConfig::default())
    }

    /// Creates a collector with a custom configuration.
    pub fn with_config(config: ExternalConfig) -> Self {
        let io_registry = lossmetric_io::builtin_registry();
        Self {
            command: String::new(),
            io_format: lossmetric_io::DEFAULT_IO_FORMAT.to_string(),
            io: Box::new(lossmetric_io::PosixIo::new()),
            io_registry,
            runner: Arc::new(SystemCommandRunner),
            config,
            input_data: Dataset::default(),
            results: placeholder_results(),
        }
    }

    /// Replaces the registry consulted for `external:io_format`.
    pub fn io_registry(mut self, registry: IoRegistry) -> Self {
        self.io_registry = registry;
        self
    }

    /// Replaces the process runner.
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ExternalConfig {
        &self.config
    }

    /// Serializes both datasets, runs the command, and records its results.
    fn run_external(&mut self, reconstructed: &Dataset) {
        let (input_file, decompressed_file) = match self.write_inputs(reconstructed) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize data for external program");
                self.results = protocol::error_results(ExternalErrorCode::IoError, 0, &e.to_string());
                return;
            }
        };

        let argv = protocol::build_arguments(
            &self.command,
            input_file.path(),
            decompressed_file.path(),
            &self.input_data,
        );
        tracing::debug!(argv = ?argv, "running external program");
        let outcome = self.runner.run(&argv);

        // Temporary files are removed here, before results are interpreted.
        drop(input_file);
        drop(decompressed_file);

        self.results = match outcome.error_code {
            ExternalErrorCode::PipeError | ExternalErrorCode::ForkError => {
                protocol::error_results(outcome.error_code, outcome.return_code, "")
            }
            _ => match protocol::parse_output(&outcome) {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        return_code = outcome.return_code,
                        "external program output is not valid"
                    );
                    protocol::error_results(ExternalErrorCode::FormatError, 0, "")
                }
            },
        };
    }

    fn write_inputs(
        &mut self,
        reconstructed: &Dataset,
    ) -> Result<(NamedTempFile, NamedTempFile), IoError> {
        let input_file = temp_file(&self.config.temp_dir, INPUT_PREFIX)?;
        write_dataset(self.io.as_mut(), &input_file, &self.input_data)?;

        let decompressed_file = temp_file(&self.config.temp_dir, DECOMPRESSED_PREFIX)?;
        write_dataset(self.io.as_mut(), &decompressed_file, reconstructed)?;

        Ok((input_file, decompressed_file))
    }
}

impl Default for ExternalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExternalMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalMetrics")
            .field("command", &self.command)
            .field("io_format", &self.io_format)
            .field("io", &self.io.name())
            .field("runner", &self.runner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MetricsPlugin for ExternalMetrics {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn begin(&mut self, original: &Dataset) {
        self.input_data = original.clone();
    }

    fn end(&mut self, _original: &Dataset, reconstructed: &Dataset, _status: i32) {
        self.run_external(reconstructed);
    }

    fn set_options(&mut self, options: &Options) -> Result<(), PluginError> {
        if let Some(command) = options.get::<String>(EXTERNAL_COMMAND) {
            self.command = command;
        }

        if let Some(format) = options.get::<String>(EXTERNAL_IO_FORMAT) {
            let io = self
                .io_registry
                .build(&format)
                .map_err(|_| PluginError::UnknownIoFormat(format.clone()))?;
            tracing::debug!(format = %format, "bound external io backend");
            self.io = io;
            self.io_format = format;
        }

        self.io.set_options(options)?;
        Ok(())
    }

    fn options(&self) -> Options {
        Options::new()
            .with(EXTERNAL_COMMAND, self.command.as_str())
            .with(EXTERNAL_IO_FORMAT, self.io_format.as_str())
    }

    fn results(&self) -> Options {
        self.results.clone()
    }

    fn duplicate(&self) -> Box<dyn MetricsPlugin> {
        Box::new(Self {
            command: self.command.clone(),
            io_format: self.io_format.clone(),
            io: self.io.duplicate(),
            io_registry: self.io_registry.clone(),
            runner: Arc::clone(&self.runner),
            config: self.config.clone(),
            input_data: self.input_data.clone(),
            results: self.results.clone(),
        })
    }
}

fn temp_file(dir: &Path, prefix: &str) -> Result<NamedTempFile, IoError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .rand_bytes(RANDOM_SUFFIX_LEN)
        .tempfile_in(dir)
        .map_err(|e| IoError::BadPath {
            path: dir.to_path_buf(),
            source: Some(e),
        })
}

/// Points `io` at `file` and writes `data` through it.
fn write_dataset(io: &mut dyn IoPlugin, file: &NamedTempFile, data: &Dataset) -> Result<(), IoError> {
    let path = file.path().to_string_lossy().into_owned();
    io.set_options(&Options::new().with(IO_PATH, path))?;
    io.write(data)
}

fn placeholder_results() -> Options {
    let mut results = Options::new();
    results.set_type(ERROR_CODE, OptionType::Int32);
    results.set_type(RETURN_CODE, OptionType::Int32);
    results.set_type(STDERR, OptionType::String);
    results
}

#[cfg(test)]
mod tests;
