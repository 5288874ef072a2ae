//! Plugin contracts for I/O backends and metrics collectors.

use crate::data::Dataset;
use crate::error::{IoError, PluginError};
use crate::options::Options;

/// Option key holding the file path an I/O backend reads from or writes to.
pub const IO_PATH: &str = "io:path";

/// Option key advertising whether a backend may be used from several threads.
pub const IO_THREAD_SAFE: &str = "io:thread_safe";

/// Thread-safety levels reported under [`IO_THREAD_SAFE`].
pub mod thread_safety {
    /// Instances must not be used concurrently.
    pub const SINGLE: i32 = 0;
    /// Separate instances may be used on separate threads.
    pub const MULTIPLE: i32 = 1;
}

/// An I/O backend that persists [`Dataset`]s in some file format.
pub trait IoPlugin: Send {
    /// Registered name of the backend (e.g. `"csv"`).
    fn name(&self) -> &'static str;

    /// Implementation-specific version string.
    fn version(&self) -> &'static str;

    /// Applies the options this backend understands; unknown keys are ignored.
    fn set_options(&mut self, options: &Options) -> Result<(), IoError>;

    /// Returns the current option values.
    fn options(&self) -> Options;

    /// Returns compile-time configuration such as thread safety.
    fn configuration(&self) -> Options {
        Options::new().with(IO_THREAD_SAFE, thread_safety::SINGLE)
    }

    /// Reads a dataset. `template`, when given, describes the expected type and
    /// shape for formats that do not carry them.
    fn read(&mut self, template: Option<Dataset>) -> Result<Dataset, IoError>;

    /// Writes `data` to the configured location.
    fn write(&mut self, data: &Dataset) -> Result<(), IoError>;

    /// Returns an independent copy of this backend and its configuration.
    fn duplicate(&self) -> Box<dyn IoPlugin>;
}

/// A metrics collector observing one compress/decompress round trip.
pub trait MetricsPlugin: Send {
    /// Registered name of the collector (e.g. `"error_stat"`).
    fn name(&self) -> &'static str;

    /// Called before compression with the original data.
    fn begin(&mut self, original: &Dataset);

    /// Called after decompression with the original and reconstructed data and
    /// the decompressor's status code.
    fn end(&mut self, original: &Dataset, reconstructed: &Dataset, status: i32);

    /// Applies collector options.
    fn set_options(&mut self, _options: &Options) -> Result<(), PluginError> {
        Ok(())
    }

    /// Returns the current option values.
    fn options(&self) -> Options {
        Options::new()
    }

    /// Returns the latest results, or typed placeholders before the first run.
    fn results(&self) -> Options;

    /// Returns an independent copy of this collector and its state.
    fn duplicate(&self) -> Box<dyn MetricsPlugin>;
}
