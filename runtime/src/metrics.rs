//! Prometheus metrics for dispatched requests.
//!
//! Recorded per request, labelled by `kind` (`command` or `query`) and
//! `request` (the request's short type name):
//! - `mediator_requests_total`: every request that reached the pipeline
//! - `mediator_requests_failed_total`: requests that returned an error
//! - `mediator_request_duration_seconds`: time spent in the pipeline and handler
//!
//! # Example
//!
//! ```rust,no_run
//! use cqrs_mediator_runtime::config::MetricsConfig;
//! use cqrs_mediator_runtime::metrics::install_prometheus_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! if let Some(handle) = install_prometheus_recorder(&MetricsConfig::default())? {
//!     // Serve this from the application's /metrics endpoint
//!     println!("{}", handle.render());
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::MetricsConfig;
use cqrs_mediator_core::composition::{Next, Outcome};
use cqrs_mediator_core::error::Result;
use cqrs_mediator_core::{Behavior, RequestRef};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Counter of dispatched requests
pub const REQUESTS_TOTAL: &str = "mediator_requests_total";

/// Counter of failed requests
pub const REQUESTS_FAILED_TOTAL: &str = "mediator_requests_failed_total";

/// Histogram of request durations in seconds
pub const REQUEST_DURATION_SECONDS: &str = "mediator_request_duration_seconds";

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register the metric descriptions.
///
/// Called by [`install_prometheus_recorder`]; call it directly when installing
/// a different recorder.
pub fn register_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests dispatched through the mediator");
    describe_counter!(REQUESTS_FAILED_TOTAL, "Total number of requests that returned an error");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time spent in the pipeline and handler per request"
    );
}

/// Install the Prometheus recorder as the global metrics recorder.
///
/// Returns the handle used to render the exposition text, or `None` when a
/// global recorder was already installed (metrics keep flowing to that one).
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the latency buckets are rejected and
/// [`MetricsError::Install`] if installation fails for another reason.
pub fn install_prometheus_recorder(config: &MetricsConfig) -> std::result::Result<Option<PrometheusHandle>, MetricsError> {
    register_metrics();

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &config.latency_buckets,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    match builder.install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus metrics recorder installed");
            Ok(Some(handle))
        }
        Err(e) => {
            let message = e.to_string();
            if message.contains("already initialized") {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(None)
            } else {
                Err(MetricsError::Install(message))
            }
        }
    }
}

/// Dispatch metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a completed request.
    pub fn record_request(request: &RequestRef<'_>, duration: Duration) {
        let kind = request.kind().as_str();
        let name = request.request_type().short_name().into_owned();
        counter!(REQUESTS_TOTAL, "kind" => kind, "request" => name.clone()).increment(1);
        histogram!(REQUEST_DURATION_SECONDS, "kind" => kind, "request" => name)
            .record(duration.as_secs_f64());
    }

    /// Record a failed request.
    pub fn record_failure(request: &RequestRef<'_>) {
        counter!(
            REQUESTS_FAILED_TOTAL,
            "kind" => request.kind().as_str(),
            "request" => request.request_type().short_name().into_owned()
        )
        .increment(1);
    }
}

/// Behavior that records [`DispatchMetrics`] for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsBehavior;

impl Behavior for MetricsBehavior {
    fn handle(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
        let start = Instant::now();
        let result = next.run();

        DispatchMetrics::record_request(&request, start.elapsed());
        if result.is_err() {
            DispatchMetrics::record_failure(&request);
        }
        result
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}
