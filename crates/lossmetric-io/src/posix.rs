//! Raw binary backend.
//!
//! Files hold the dataset's elements as native-endian bytes with no header.
//! The element type and shape are not stored, so reads either take them from a
//! template dataset or fall back to a flat byte buffer.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use lossmetric_core::{
    thread_safety, DataBuffer, Dataset, IoError, IoPlugin, OptionType, Options, IO_PATH,
    IO_THREAD_SAFE,
};

/// Native-endian raw binary reader/writer.
#[derive(Debug, Clone, Default)]
pub struct PosixIo {
    path: Option<PathBuf>,
}

impl PosixIo {
    /// Registered name of this backend.
    pub const NAME: &'static str = "posix";

    /// Creates a backend with no path configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pointed at `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn path(&self) -> Result<&Path, IoError> {
        self.path
            .as_deref()
            .ok_or_else(|| IoError::bad_path(PathBuf::new()))
    }
}

impl IoPlugin for PosixIo {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn set_options(&mut self, options: &Options) -> Result<(), IoError> {
        if let Some(path) = options.get::<String>(IO_PATH) {
            self.path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn options(&self) -> Options {
        let mut opts = Options::new();
        match &self.path {
            Some(path) => opts.set(IO_PATH, path.to_string_lossy().into_owned()),
            None => opts.set_type(IO_PATH, OptionType::String),
        }
        opts
    }

    fn configuration(&self) -> Options {
        Options::new().with(IO_THREAD_SAFE, thread_safety::MULTIPLE)
    }

    fn read(&mut self, template: Option<Dataset>) -> Result<Dataset, IoError> {
        let path = self.path()?;
        let bytes = std::fs::read(path).map_err(|e| IoError::BadPath {
            path: path.to_path_buf(),
            source: Some(e),
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read raw file");

        match template {
            Some(template) => {
                if bytes.len() != template.size_in_bytes() {
                    return Err(IoError::SizeMismatch {
                        expected: template.size_in_bytes(),
                        actual: bytes.len(),
                    });
                }
                Ok(Dataset::from_ne_bytes(
                    template.dtype(),
                    template.dims().to_vec(),
                    &bytes,
                )?)
            }
            None => {
                let len = bytes.len();
                Ok(Dataset::new(DataBuffer::Byte(bytes), vec![len])?)
            }
        }
    }

    fn write(&mut self, data: &Dataset) -> Result<(), IoError> {
        let path = self.path()?;
        let mut file = File::create(path).map_err(|e| IoError::BadPath {
            path: path.to_path_buf(),
            source: Some(e),
        })?;
        file.write_all(&data.to_ne_bytes())?;
        file.flush()?;
        tracing::debug!(
            path = %path.display(),
            dtype = %data.dtype(),
            elements = data.num_elements(),
            "wrote raw file"
        );
        Ok(())
    }

    fn duplicate(&self) -> Box<dyn IoPlugin> {
        Box::new(self.clone())
    }
}
