//! Structured logging around every dispatched request.

use crate::config::LoggingConfig;
use cqrs_mediator_core::composition::{Next, Outcome};
use cqrs_mediator_core::error::Result;
use cqrs_mediator_core::{Behavior, RequestRef};
use std::time::{Duration, Instant};

/// Behavior that wraps each request in a `mediator_request` span
///
/// Completion is logged at `debug` with the elapsed time. A request slower
/// than the configured threshold is logged at `warn`, and so is a failure.
/// The result is returned unchanged in every case.
///
/// # Example
///
/// ```
/// use cqrs_mediator_core::{BehaviorCategory, Mediator};
/// use cqrs_mediator_runtime::logging::LoggingBehavior;
/// use std::time::Duration;
///
/// let builder = Mediator::builder().behavior(
///     BehaviorCategory::Global,
///     LoggingBehavior::new().with_slow_threshold(Some(Duration::from_millis(100))),
/// );
/// # let _ = builder;
/// ```
#[derive(Debug, Clone)]
pub struct LoggingBehavior {
    slow_threshold: Option<Duration>,
    log_failures: bool,
}

impl LoggingBehavior {
    /// Create a logging behavior with the default settings
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&LoggingConfig::default())
    }

    /// Create a logging behavior from configuration
    #[must_use]
    pub const fn from_config(config: &LoggingConfig) -> Self {
        Self {
            slow_threshold: config.slow_threshold(),
            log_failures: config.log_failures,
        }
    }

    /// Set the slow request threshold; `None` disables the warning
    #[must_use]
    pub const fn with_slow_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Enable or disable failure logging
    #[must_use]
    pub const fn with_log_failures(mut self, enabled: bool) -> Self {
        self.log_failures = enabled;
        self
    }

    fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_threshold.is_some_and(|threshold| elapsed >= threshold)
    }
}

impl Default for LoggingBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for LoggingBehavior {
    fn handle(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
        let span = tracing::debug_span!(
            "mediator_request",
            request = %request.request_type().short_name(),
            kind = %request.kind(),
        );
        let _enter = span.enter();

        let start = Instant::now();
        let result = next.run();
        let elapsed = start.elapsed();

        match &result {
            Ok(_) if self.is_slow(elapsed) => {
                tracing::warn!(?elapsed, threshold = ?self.slow_threshold, "Slow request");
            }
            Ok(_) => tracing::debug!(?elapsed, "Request completed"),
            Err(error) if self.log_failures => {
                tracing::warn!(error = %error, ?elapsed, "Request failed");
            }
            Err(_) => {}
        }

        result
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
