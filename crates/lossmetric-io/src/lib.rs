//! lossmetric I/O backends.
//!
//! Concrete [`IoPlugin`](lossmetric_core::IoPlugin) implementations:
//!
//! - [`PosixIo`] (`"posix"`): raw native-endian element bytes
//! - [`CsvIo`] (`"csv"`): comma-separated 2-D tables
//!
//! # Example
//!
//! ```no_run
//! use lossmetric_core::{Dataset, Options, IO_PATH};
//!
//! let registry = lossmetric_io::builtin_registry();
//! let mut io = registry.build("csv").unwrap();
//! io.set_options(&Options::new().with(IO_PATH, "table.csv")).unwrap();
//!
//! let data = Dataset::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
//! io.write(&data).unwrap();
//! ```

mod csv;
mod posix;

pub use csv::{CsvIo, CSV_HEADERS, CSV_SKIP_ROWS};
pub use posix::PosixIo;

use lossmetric_core::{IoPlugin, IoRegistry, RegistryError};

/// Name of the backend used when none is configured.
pub const DEFAULT_IO_FORMAT: &str = PosixIo::NAME;

/// Registers the built-in backends into `registry`.
pub fn register_builtins(registry: &mut IoRegistry) -> Result<(), RegistryError> {
    registry.register(PosixIo::NAME, || Box::new(PosixIo::new()) as Box<dyn IoPlugin>)?;
    registry.register(CsvIo::NAME, || Box::new(CsvIo::new()) as Box<dyn IoPlugin>)?;
    Ok(())
}

/// Returns a registry holding only the built-in backends.
pub fn builtin_registry() -> IoRegistry {
    let mut registry = IoRegistry::new();
    // A fresh registry cannot already contain the built-in names.
    let _ = register_builtins(&mut registry);
    registry
}

#[cfg(test)]
mod tests;
