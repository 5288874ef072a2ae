//! Loading dataset pairs from disk.

use std::path::Path;

use anyhow::{Context, Result};

use lossmetric_core::{DType, Dataset, Options, IO_PATH};

/// How the files of a pair are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFormat {
    /// Registered I/O backend name.
    pub io_format: String,
    /// Element type, for formats that do not record one.
    pub dtype: Option<DType>,
    /// Extents, for formats that do not record them.
    pub dims: Vec<usize>,
}

impl Default for InputFormat {
    fn default() -> Self {
        Self {
            io_format: lossmetric_io::DEFAULT_IO_FORMAT.to_string(),
            dtype: None,
            dims: Vec::new(),
        }
    }
}

/// Reads the original and decompressed datasets.
pub fn load_pair(
    input: &Path,
    decompressed: &Path,
    format: &InputFormat,
) -> Result<(Dataset, Dataset)> {
    let original = load(input, format)
        .with_context(|| format!("Failed to read input: {}", input.display()))?;
    let reconstructed = load(decompressed, format)
        .with_context(|| format!("Failed to read decompressed: {}", decompressed.display()))?;
    Ok((original, reconstructed))
}

/// Reads one dataset with the configured backend.
///
/// For raw files with a type but no extents, the file is read as a flat array
/// whose length follows from the file size.
pub fn load(path: &Path, format: &InputFormat) -> Result<Dataset> {
    let registry = lossmetric_io::builtin_registry();
    let mut io = registry
        .build(&format.io_format)
        .with_context(|| format!("Unknown io format '{}'", format.io_format))?;
    io.set_options(&Options::new().with(IO_PATH, path.to_string_lossy().into_owned()))?;

    // Only raw files need a type and shape from the caller.
    let template = match format.dtype {
        Some(dtype) if format.io_format == lossmetric_io::PosixIo::NAME => {
            Some(raw_template(path, dtype, &format.dims)?)
        }
        _ => None,
    };

    let data = io.read(template)?;
    tracing::debug!(
        path = %path.display(),
        dtype = %data.dtype(),
        dims = ?data.dims(),
        "loaded dataset"
    );
    Ok(data)
}

/// Builds the read template for a raw file, checking the file size against
/// the requested type and shape before anything is allocated.
fn raw_template(path: &Path, dtype: DType, dims: &[usize]) -> Result<Dataset> {
    let file_len = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();

    let dims = if dims.is_empty() {
        let len = usize::try_from(file_len)
            .with_context(|| format!("{} is too large to load", path.display()))?;
        vec![len / dtype.size()]
    } else {
        dims.to_vec()
    };

    let expected = Dataset::byte_size(dtype, &dims)
        .with_context(|| format!("Shape {:?} of {} is too large", dims, dtype))?;
    if expected as u64 != file_len {
        anyhow::bail!(
            "{} holds {} bytes but {:?} {} elements need {}",
            path.display(),
            file_len,
            dims,
            dtype,
            expected
        );
    }
    Ok(Dataset::empty(dtype, dims)?)
}
