//! Runtime configuration for the standard behaviors.
//!
//! The structs deserialize with `serde`, so a host application can embed them
//! in its own configuration file. Every field has a default; a partial
//! document only overrides what it names.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency buckets (seconds) used for the dispatch duration histogram.
pub const DEFAULT_LATENCY_BUCKETS: &[f64] = &[
    0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Configuration for every runtime component
///
/// # Example
///
/// ```
/// use cqrs_mediator_runtime::config::{LoggingConfig, RuntimeConfig};
///
/// let config = RuntimeConfig::default()
///     .with_logging(LoggingConfig::default().with_slow_threshold_ms(250));
///
/// assert_eq!(config.logging.slow_threshold_ms, 250);
/// assert!(config.metrics.enabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Logging behavior settings
    pub logging: LoggingConfig,
    /// Metrics behavior settings
    pub metrics: MetricsConfig,
}

impl RuntimeConfig {
    /// Create a configuration from its parts
    #[must_use]
    pub const fn new(logging: LoggingConfig, metrics: MetricsConfig) -> Self {
        Self { logging, metrics }
    }

    /// Replace the logging settings
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Replace the metrics settings
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Settings for [`LoggingBehavior`](crate::logging::LoggingBehavior)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Requests slower than this are logged at `warn`; `0` disables the check
    pub slow_threshold_ms: u64,
    /// Log failed requests at `warn`
    pub log_failures: bool,
}

impl LoggingConfig {
    /// Set the slow request threshold in milliseconds
    #[must_use]
    pub const fn with_slow_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.slow_threshold_ms = threshold_ms;
        self
    }

    /// Enable or disable failure logging
    #[must_use]
    pub const fn with_log_failures(mut self, enabled: bool) -> Self {
        self.log_failures = enabled;
        self
    }

    /// The slow request threshold, `None` when disabled
    #[must_use]
    pub const fn slow_threshold(&self) -> Option<Duration> {
        if self.slow_threshold_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.slow_threshold_ms))
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: 500,
            log_failures: true,
        }
    }
}

/// Settings for [`MetricsBehavior`](crate::metrics::MetricsBehavior) and the
/// Prometheus recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Include the metrics behavior in the standard behaviors
    pub enabled: bool,
    /// Histogram buckets (seconds) for the dispatch duration
    pub latency_buckets: Vec<f64>,
}

impl MetricsConfig {
    /// Enable or disable the metrics behavior
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the latency buckets
    #[must_use]
    pub fn with_latency_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.latency_buckets = buckets;
        self
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latency_buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
        }
    }
}
