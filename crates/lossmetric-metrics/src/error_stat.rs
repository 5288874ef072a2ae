//! Streaming error statistics between an original and a reconstructed dataset.
//!
//! All metrics are computed in a single lockstep pass over both datasets.
//! Every element is promoted to `f64` before any arithmetic, including the
//! signed difference, so unsigned inputs never wrap.
//!
//! # Metrics
//!
//! | Key | Definition |
//! |-----|------------|
//! | `mse` | mean of squared differences |
//! | `rmse` | `sqrt(mse)` |
//! | `psnr` | `-20 * log10(rmse / value_range)` |
//! | `value_mean` | mean of original values |
//! | `value_std` | `sum(x^2) - sum(x)^2 / n` (not normalized by `n`) |
//! | `value_min`, `value_max`, `value_range` | extent of original values |
//! | `min_error`, `max_error`, `error_range` | extent of absolute differences |
//! | `min_rel_error`, `max_rel_error` | absolute error extent over `value_range` |
//! | `average_difference`, `difference_range` | signed differences |
//! | `average_error` | mean absolute difference |
//!
//! Zero ranges are not guarded: identical inputs give `psnr = +inf`, and a
//! constant original gives `NaN`/`inf` relative errors.

use serde::Serialize;
use thiserror::Error;

use lossmetric_core::options::serialize_f64;
use lossmetric_core::{Dataset, MetricsPlugin, OptionType, Options};

/// Errors raised by [`ErrorMetrics::compute`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// The two datasets hold different numbers of elements.
    #[error("original has {original} elements but reconstructed has {reconstructed}")]
    LengthMismatch {
        original: usize,
        reconstructed: usize,
    },
}

/// Fidelity metrics for one original/reconstructed pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorMetrics {
    #[serde(serialize_with = "serialize_f64")]
    pub psnr: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub mse: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub rmse: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub value_range: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub min_error: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub max_error: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub min_rel_error: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub max_rel_error: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub average_difference: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub average_error: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub difference_range: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub error_range: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub value_min: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub value_max: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub value_std: f64,
    #[serde(serialize_with = "serialize_f64")]
    pub value_mean: f64,
}

impl ErrorMetrics {
    /// Field names in result order.
    pub const FIELDS: [&'static str; 16] = [
        "psnr",
        "mse",
        "rmse",
        "value_mean",
        "value_std",
        "value_min",
        "value_max",
        "value_range",
        "min_error",
        "max_error",
        "min_rel_error",
        "max_rel_error",
        "average_difference",
        "average_error",
        "difference_range",
        "error_range",
    ];

    /// Computes the metrics in one pass over both datasets.
    ///
    /// The datasets must hold the same number of elements. Element types may
    /// differ; both sides are promoted to `f64`. An empty pair yields `NaN` in
    /// every field.
    pub fn compute(original: &Dataset, reconstructed: &Dataset) -> Result<Self, MetricsError> {
        if original.num_elements() != reconstructed.num_elements() {
            return Err(MetricsError::LengthMismatch {
                original: original.num_elements(),
                reconstructed: reconstructed.num_elements(),
            });
        }

        let mut acc = Accumulator::new();
        for (value, decompressed) in original.values_f64().zip(reconstructed.values_f64()) {
            acc.push(value, decompressed);
        }
        Ok(acc.finish())
    }

    /// Returns `(name, value)` pairs in [`ErrorMetrics::FIELDS`] order.
    pub fn fields(&self) -> [(&'static str, f64); 16] {
        [
            ("psnr", self.psnr),
            ("mse", self.mse),
            ("rmse", self.rmse),
            ("value_mean", self.value_mean),
            ("value_std", self.value_std),
            ("value_min", self.value_min),
            ("value_max", self.value_max),
            ("value_range", self.value_range),
            ("min_error", self.min_error),
            ("max_error", self.max_error),
            ("min_rel_error", self.min_rel_error),
            ("max_rel_error", self.max_rel_error),
            ("average_difference", self.average_difference),
            ("average_error", self.average_error),
            ("difference_range", self.difference_range),
            ("error_range", self.error_range),
        ]
    }

    fn all_nan() -> Self {
        Self {
            psnr: f64::NAN,
            mse: f64::NAN,
            rmse: f64::NAN,
            value_range: f64::NAN,
            min_error: f64::NAN,
            max_error: f64::NAN,
            min_rel_error: f64::NAN,
            max_rel_error: f64::NAN,
            average_difference: f64::NAN,
            average_error: f64::NAN,
            difference_range: f64::NAN,
            error_range: f64::NAN,
            value_min: f64::NAN,
            value_max: f64::NAN,
            value_std: f64::NAN,
            value_mean: f64::NAN,
        }
    }
}

/// Running sums and extents for a single pass.
#[derive(Debug, Clone)]
struct Accumulator {
    count: usize,
    sum: f64,
    sum_of_values_squared: f64,
    sum_of_difference: f64,
    sum_of_error: f64,
    sum_of_squared_error: f64,
    value_min: f64,
    value_max: f64,
    diff_min: f64,
    diff_max: f64,
    error_min: f64,
    error_max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_of_values_squared: 0.0,
            sum_of_difference: 0.0,
            sum_of_error: 0.0,
            sum_of_squared_error: 0.0,
            value_min: f64::INFINITY,
            value_max: f64::NEG_INFINITY,
            diff_min: f64::INFINITY,
            diff_max: f64::NEG_INFINITY,
            error_min: f64::INFINITY,
            error_max: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, value: f64, decompressed: f64) {
        let diff = value - decompressed;
        let error = diff.abs();

        self.sum += value;
        self.sum_of_values_squared += value * value;
        self.sum_of_difference += diff;
        self.sum_of_error += error;
        self.sum_of_squared_error += error * error;
        self.value_min = self.value_min.min(value);
        self.value_max = self.value_max.max(value);
        self.diff_min = self.diff_min.min(diff);
        self.diff_max = self.diff_max.max(diff);
        self.error_min = self.error_min.min(error);
        self.error_max = self.error_max.max(error);
        self.count += 1;
    }

    fn finish(self) -> ErrorMetrics {
        if self.count == 0 {
            return ErrorMetrics::all_nan();
        }

        let n = self.count as f64;
        let mse = self.sum_of_squared_error / n;
        let rmse = mse.sqrt();
        let value_range = self.value_max - self.value_min;

        ErrorMetrics {
            psnr: -20.0 * (rmse / value_range).log10(),
            mse,
            rmse,
            value_range,
            min_error: self.error_min,
            max_error: self.error_max,
            min_rel_error: self.error_min / value_range,
            max_rel_error: self.error_max / value_range,
            average_difference: self.sum_of_difference / n,
            average_error: self.sum_of_error / n,
            difference_range: self.diff_max - self.diff_min,
            error_range: self.error_max - self.error_min,
            value_min: self.value_min,
            value_max: self.value_max,
            value_std: self.sum_of_values_squared - (self.sum * self.sum) / n,
            value_mean: self.sum / n,
        }
    }
}

/// Result key prefix for this collector.
const PREFIX: &str = "error_stat";

/// Metrics collector computing [`ErrorMetrics`] at the end of each round trip.
#[derive(Debug, Clone)]
pub struct ErrorStat {
    original: Dataset,
    metrics: Option<ErrorMetrics>,
}

impl ErrorStat {
    /// Registered name of this collector.
    pub const NAME: &'static str = "error_stat";

    pub fn new() -> Self {
        Self {
            original: Dataset::default(),
            metrics: None,
        }
    }

    /// Returns the metrics of the last completed round trip.
    pub fn metrics(&self) -> Option<&ErrorMetrics> {
        self.metrics.as_ref()
    }
}

impl Default for ErrorStat {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsPlugin for ErrorStat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn begin(&mut self, original: &Dataset) {
        self.original = original.clone();
    }

    fn end(&mut self, _original: &Dataset, reconstructed: &Dataset, _status: i32) {
        match ErrorMetrics::compute(&self.original, reconstructed) {
            Ok(metrics) => self.metrics = Some(metrics),
            Err(e) => {
                tracing::warn!(error = %e, "error statistics not computed");
                self.metrics = None;
            }
        }
    }

    fn results(&self) -> Options {
        let mut opts = Options::new();
        match &self.metrics {
            Some(metrics) => {
                for (name, value) in metrics.fields() {
                    opts.set(format!("{}:{}", PREFIX, name), value);
                }
            }
            None => {
                for name in ErrorMetrics::FIELDS {
                    opts.set_type(format!("{}:{}", PREFIX, name), OptionType::Double);
                }
            }
        }
        opts
    }

    fn duplicate(&self) -> Box<dyn MetricsPlugin> {
        Box::new(self.clone())
    }
}
