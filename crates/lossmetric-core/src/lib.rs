//! lossmetric core library
//!
//! Types shared by every lossmetric plugin crate:
//!
//! - [`data`]: typed multi-dimensional [`Dataset`] buffers
//! - [`dtype`]: the scalar element types a dataset can hold
//! - [`options`]: the typed key/value [`Options`] store used for plugin
//!   configuration and results
//! - [`plugin`]: the [`IoPlugin`] and [`MetricsPlugin`] contracts
//! - [`registry`]: explicit name → constructor registries
//! - [`error`]: error types with stable numeric codes
//!
//! # Example
//!
//! ```
//! use lossmetric_core::{Dataset, DType, Options};
//!
//! let data = Dataset::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
//! assert_eq!(data.dtype(), DType::Float);
//! assert_eq!(data.values_f64().sum::<f64>(), 10.0);
//!
//! let opts = Options::new().with("io:path", "data.bin");
//! assert_eq!(opts.get::<String>("io:path").as_deref(), Some("data.bin"));
//! ```

pub mod data;
pub mod dtype;
pub mod error;
pub mod options;
pub mod plugin;
pub mod registry;

pub use data::{DataBuffer, Dataset, Element, ValuesF64};
pub use dtype::{DType, UnknownDType};
pub use error::{DataError, IoError, PluginError, PluginErrorCode, RegistryError};
pub use options::{FromOptionValue, KeyStatus, OptionType, OptionValue, Options};
pub use plugin::{thread_safety, IoPlugin, MetricsPlugin, IO_PATH, IO_THREAD_SAFE};
pub use registry::{Constructor, IoRegistry, MetricsRegistry, Registry};
