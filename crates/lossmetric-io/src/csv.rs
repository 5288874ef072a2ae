//! CSV backend for 2-D datasets.
//!
//! # Format
//!
//! An optional header line of comma-separated column names, then one line per
//! row with comma-separated values. `dims[0]` is the row count and `dims[1]`
//! the column count; elements are stored row-major.
//!
//! Writing uses each element's default text form. Reading always produces a
//! `double` dataset regardless of the text on disk.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use lossmetric_core::{
    thread_safety, Dataset, IoError, IoPlugin, OptionType, Options, IO_PATH, IO_THREAD_SAFE,
};

/// Option key for the column names written as the first line.
pub const CSV_HEADERS: &str = "csv:headers";

/// Option key for the number of leading lines skipped when reading.
pub const CSV_SKIP_ROWS: &str = "csv:skip_rows";

/// Comma-separated values reader/writer.
#[derive(Debug, Clone, Default)]
pub struct CsvIo {
    path: Option<PathBuf>,
    headers: Vec<String>,
    skip_rows: u32,
}

impl CsvIo {
    /// Registered name of this backend.
    pub const NAME: &'static str = "csv";

    /// Creates a backend with no path, no headers, and no skipped rows.
    pub fn new() -> Self {
        Self::default()
    }

    fn path(&self) -> Result<&Path, IoError> {
        self.path
            .as_deref()
            .ok_or_else(|| IoError::bad_path(PathBuf::new()))
    }
}

impl IoPlugin for CsvIo {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn version(&self) -> &'static str {
        "0.0.1"
    }

    fn set_options(&mut self, options: &Options) -> Result<(), IoError> {
        if let Some(path) = options.get::<String>(IO_PATH) {
            self.path = Some(PathBuf::from(path));
        }
        if let Some(headers) = options.get::<Vec<String>>(CSV_HEADERS) {
            self.headers = headers;
        }
        if let Some(skip_rows) = options.get::<u32>(CSV_SKIP_ROWS) {
            self.skip_rows = skip_rows;
        }
        Ok(())
    }

    fn options(&self) -> Options {
        let mut opts = Options::new()
            .with(CSV_HEADERS, self.headers.clone())
            .with(CSV_SKIP_ROWS, self.skip_rows);
        match &self.path {
            Some(path) => opts.set(IO_PATH, path.to_string_lossy().into_owned()),
            None => opts.set_type(IO_PATH, OptionType::String),
        }
        opts
    }

    fn configuration(&self) -> Options {
        Options::new().with(IO_THREAD_SAFE, thread_safety::MULTIPLE)
    }

    fn read(&mut self, _template: Option<Dataset>) -> Result<Dataset, IoError> {
        let path = self.path()?;
        let file = File::open(path).map_err(|e| IoError::BadPath {
            path: path.to_path_buf(),
            source: Some(e),
        })?;

        let mut values = Vec::new();
        let mut rows = 0usize;
        let mut columns: Option<usize> = None;

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if index < self.skip_rows as usize || line.trim().is_empty() {
                continue;
            }

            let mut fields = 0usize;
            for field in line.split(',') {
                let value = field.trim().parse::<f64>().map_err(|e| IoError::Parse {
                    line: index + 1,
                    message: format!("'{}': {}", field.trim(), e),
                })?;
                values.push(value);
                fields += 1;
            }

            match columns {
                Some(expected) if expected != fields => {
                    return Err(IoError::Parse {
                        line: index + 1,
                        message: format!("expected {} fields, found {}", expected, fields),
                    });
                }
                _ => columns = Some(fields),
            }
            rows += 1;
        }

        tracing::debug!(path = %path.display(), rows, "read csv file");
        Ok(Dataset::from_vec(values, vec![rows, columns.unwrap_or(0)])?)
    }

    fn write(&mut self, data: &Dataset) -> Result<(), IoError> {
        // Validate before touching the file so a rejected write leaves nothing behind.
        if data.num_dimensions() != 2 {
            return Err(IoError::InvalidDimensions {
                dims: data.num_dimensions(),
            });
        }
        let rows = data.dimension(0);
        let columns = data.dimension(1);
        if !self.headers.is_empty() && self.headers.len() != columns {
            return Err(IoError::InvalidHeaders {
                headers: self.headers.len(),
                columns,
            });
        }

        let path = self.path()?;
        let file = File::create(path).map_err(|e| IoError::BadPath {
            path: path.to_path_buf(),
            source: Some(e),
        })?;
        let mut out = BufWriter::new(file);

        if !self.headers.is_empty() {
            writeln!(out, "{}", self.headers.join(","))?;
        }

        let buffer = data.buffer();
        for row in 0..rows {
            let line = (0..columns)
                .filter_map(|col| buffer.format_element(row * columns + col))
                .collect::<Vec<_>>()
                .join(",");
            writeln!(out, "{}", line)?;
        }
        out.flush()?;

        tracing::debug!(path = %path.display(), rows, columns, "wrote csv file");
        Ok(())
    }

    fn duplicate(&self) -> Box<dyn IoPlugin> {
        Box::new(self.clone())
    }
}
