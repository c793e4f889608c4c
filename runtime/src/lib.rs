//! # CQRS Mediator Runtime
//!
//! Ready-made behaviors, hooks and configuration for the mediator.
//!
//! ## Components
//!
//! - **`LoggingBehavior`**: a `tracing` span per request, slow and failed requests at `warn`
//! - **`MetricsBehavior`**: request counters and latency histogram via `metrics`
//! - **`TracingHooks`**: lifecycle events as `tracing` events
//! - **`RuntimeConfig`**: serde-loadable settings for all of the above
//!
//! ## Example
//!
//! ```
//! use cqrs_mediator_core::{command, handler_fn, Mediator};
//! use cqrs_mediator_runtime::{MediatorBuilderExt, RuntimeConfig, TracingHooks};
//!
//! struct Ping;
//! command!(Ping => &'static str);
//!
//! let mediator = Mediator::builder()
//!     .handler(handler_fn(|_: &Ping| Ok("pong")))
//!     .standard_behaviors(&RuntimeConfig::default())
//!     .hooks(TracingHooks)
//!     .build()
//!     .ok();
//!
//! assert_eq!(mediator.and_then(|m| m.dispatch(Ping).ok()), Some("pong"));
//! ```

use cqrs_mediator_core::{Behavior, BehaviorCategory, BehaviorChain, BehaviorId, MediatorBuilder};
use std::sync::Arc;

/// Runtime configuration
pub mod config;

/// Logging behavior
pub mod logging;

/// Prometheus metrics
pub mod metrics;

/// Tracing lifecycle hooks
pub mod hooks;

pub use config::{LoggingConfig, MetricsConfig, RuntimeConfig};
pub use hooks::TracingHooks;
pub use logging::LoggingBehavior;
pub use metrics::{MetricsBehavior, MetricsError, install_prometheus_recorder, register_metrics};

/// Order of the logging behavior: outside everything else
pub const LOGGING_ORDER: i32 = -200;

/// Order of the metrics behavior: inside logging, outside application behaviors
pub const METRICS_ORDER: i32 = -100;

/// The configured global behaviors with their orders, outermost first.
#[must_use]
pub fn standard_behaviors(config: &RuntimeConfig) -> Vec<(i32, Arc<dyn Behavior>)> {
    let logging: Arc<dyn Behavior> = Arc::new(LoggingBehavior::from_config(&config.logging));
    let mut behaviors = vec![(LOGGING_ORDER, logging)];
    if config.metrics.enabled {
        let metrics: Arc<dyn Behavior> = Arc::new(MetricsBehavior);
        behaviors.push((METRICS_ORDER, metrics));
    }
    behaviors
}

/// Add the standard behaviors to an existing chain as global behaviors.
///
/// Returns their ids so they can be removed again.
pub fn install_standard_behaviors(chain: &BehaviorChain, config: &RuntimeConfig) -> Vec<BehaviorId> {
    standard_behaviors(config)
        .into_iter()
        .map(|(order, behavior)| chain.add_shared(BehaviorCategory::Global, order, behavior))
        .collect()
}

/// Extension methods for [`MediatorBuilder`]
pub trait MediatorBuilderExt: Sized {
    /// Add the standard behaviors as global behaviors
    #[must_use]
    fn standard_behaviors(self, config: &RuntimeConfig) -> Self;
}

impl MediatorBuilderExt for MediatorBuilder {
    fn standard_behaviors(self, config: &RuntimeConfig) -> Self {
        standard_behaviors(config)
            .into_iter()
            .fold(self, |builder, (order, behavior)| {
                builder.behavior_shared(BehaviorCategory::Global, order, behavior)
            })
    }
}
