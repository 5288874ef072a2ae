//! lossmetric metrics collectors.
//!
//! Two [`MetricsPlugin`](lossmetric_core::MetricsPlugin) implementations:
//!
//! - [`ErrorStat`] (`"error_stat"`): streaming error statistics between an
//!   original and a reconstructed dataset
//! - [`ExternalMetrics`] (`"external"`): delegates analysis to an external
//!   program over a small command line and stdout protocol
//!
//! # Example
//!
//! ```
//! use lossmetric_core::{Dataset, MetricsPlugin};
//! use lossmetric_metrics::ErrorStat;
//!
//! let original = Dataset::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], vec![4]).unwrap();
//! let reconstructed = Dataset::from_vec(vec![1.0f64, 2.0, 3.0, 5.0], vec![4]).unwrap();
//!
//! let mut stat = ErrorStat::new();
//! stat.begin(&original);
//! stat.end(&original, &reconstructed, 0);
//!
//! assert_eq!(stat.results().get::<f64>("error_stat:max_error"), Some(1.0));
//! ```

pub mod error_stat;
pub mod external;

pub use error_stat::{ErrorMetrics, ErrorStat, MetricsError};
pub use external::{
    CommandRunner, ExternalConfig, ExternalErrorCode, ExternalMetrics, ProcessOutcome,
    SystemCommandRunner, EXTERNAL_COMMAND, EXTERNAL_IO_FORMAT,
};

use lossmetric_core::{MetricsPlugin, MetricsRegistry, RegistryError};

/// Registers the built-in collectors into `registry`.
pub fn register_builtins(registry: &mut MetricsRegistry) -> Result<(), RegistryError> {
    registry.register(ErrorStat::NAME, || {
        Box::new(ErrorStat::new()) as Box<dyn MetricsPlugin>
    })?;
    registry.register(ExternalMetrics::NAME, || {
        Box::new(ExternalMetrics::new()) as Box<dyn MetricsPlugin>
    })?;
    Ok(())
}

/// Returns a registry holding only the built-in collectors.
pub fn builtin_registry() -> MetricsRegistry {
    let mut registry = MetricsRegistry::new();
    // A fresh registry cannot already contain the built-in names.
    let _ = register_builtins(&mut registry);
    registry
}
