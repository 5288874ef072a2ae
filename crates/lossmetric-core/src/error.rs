//! Error types shared by plugins.

use std::path::PathBuf;
use thiserror::Error;

use crate::dtype::DType;

/// Common trait for plugin errors.
///
/// Plugins report failures with a stable numeric code (0 is reserved for
/// success) plus a human-readable message, so that callers which only keep
/// the code can still tell failures apart.
pub trait PluginErrorCode: std::error::Error {
    /// Stable, implementation-specific error code. Never 0.
    fn code(&self) -> i32;

    /// Category of the plugin family reporting the error (e.g. "io").
    fn category(&self) -> &'static str;

    /// Human-readable message; defaults to `Display`.
    fn message(&self) -> String {
        self.to_string()
    }
}

/// Errors raised while building or decoding a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// Buffer length does not match the product of the extents.
    #[error("shape holds {expected} elements but the buffer has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Byte length is not a multiple of the element width.
    #[error("{len} bytes is not a whole number of {dtype} elements")]
    ByteLength { dtype: DType, len: usize },

    /// The extents multiply past the addressable size.
    #[error("shape {dims:?} is too large to address")]
    Overflow { dims: Vec<usize> },
}

/// Errors reported by I/O backends.
#[derive(Debug, Error)]
pub enum IoError {
    /// The backend only supports a fixed dimensionality.
    #[error("only 2d data is supported")]
    InvalidDimensions { dims: usize },

    /// Header count does not match the column count.
    #[error("headers size must match number of columns")]
    InvalidHeaders { headers: usize, columns: usize },

    /// The path could not be opened or created.
    #[error("bad path {}", .path.display())]
    BadPath {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// File content could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// File size does not match the requested template.
    #[error("expected {expected} bytes but the file holds {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Decoded content does not form a valid dataset.
    #[error(transparent)]
    Data(#[from] DataError),

    /// I/O error while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    /// Creates a `BadPath` error without an underlying cause.
    pub fn bad_path(path: impl Into<PathBuf>) -> Self {
        Self::BadPath {
            path: path.into(),
            source: None,
        }
    }
}

impl PluginErrorCode for IoError {
    fn code(&self) -> i32 {
        match self {
            IoError::InvalidDimensions { .. } => 1,
            IoError::InvalidHeaders { .. } => 2,
            IoError::BadPath { .. } => 3,
            IoError::Parse { .. } => 4,
            IoError::SizeMismatch { .. } => 5,
            IoError::Data(_) => 6,
            IoError::Io(_) => 7,
        }
    }

    fn category(&self) -> &'static str {
        "io"
    }
}

/// Errors reported by metrics plugins while being configured.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The requested io format is not registered.
    #[error("unknown io format '{0}'")]
    UnknownIoFormat(String),

    /// The bound I/O backend rejected its options.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl PluginErrorCode for PluginError {
    fn code(&self) -> i32 {
        match self {
            PluginError::UnknownIoFormat(_) => 1,
            PluginError::Io(_) => 2,
        }
    }

    fn category(&self) -> &'static str {
        "metrics"
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A plugin with this name is already registered.
    #[error("plugin already registered: {0}")]
    AlreadyRegistered(String),

    /// No plugin with this name is registered.
    #[error("plugin not found: {0}")]
    NotFound(String),
}
