//! # CQRS Mediator Testing
//!
//! Testing utilities for applications built on the mediator.
//!
//! This crate provides:
//! - [`Trace`] and recording behaviors/middleware for asserting chain order
//! - [`ShortCircuit`] and [`Reject`] behaviors for exercising short-circuits and failures
//! - [`CountingHooks`] for asserting lifecycle calls
//! - [`DispatchTest`], a Given-When-Then harness around one dispatch
//! - [`init_test_tracing`] to see `tracing` output from tests
//!
//! ## Example
//!
//! ```
//! use cqrs_mediator_core::{command, handler_fn, BehaviorCategory};
//! use cqrs_mediator_testing::{DispatchTest, RecordingBehavior, Trace};
//!
//! struct Archive(u32);
//! command!(Archive => u32);
//!
//! let trace = Trace::new();
//! DispatchTest::new()
//!     .given_handler(handler_fn(|a: &Archive| Ok(a.0)))
//!     .given_behavior(BehaviorCategory::Global, RecordingBehavior::new("outer", &trace))
//!     .given_behavior(BehaviorCategory::Command, RecordingBehavior::new("inner", &trace))
//!     .when_command(Archive(7))
//!     .then_output(|id| assert_eq!(*id, 7))
//!     .run();
//!
//! assert_eq!(
//!     trace.entries(),
//!     vec!["outer:before", "inner:before", "inner:after", "outer:after"]
//! );
//! ```

use std::sync::Once;

/// Test doubles
pub mod doubles;


pub use dispatch_test::DispatchTest;
pub use dispatch_test::assertions;
pub use doubles::{CountingHooks, RecordingBehavior, RecordingMiddleware, Reject, ShortCircuit, Trace};

static INIT_TRACING: Once = Once::new();

/// Install a `tracing` subscriber that writes through the test harness.
///
/// The filter comes from `RUST_LOG` and defaults to `debug` for the mediator
/// crates. Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "cqrs_mediator_core=debug,cqrs_mediator_runtime=debug".into());

        // Another subscriber may already be installed by the host test binary.
        if tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already installed");
        }
    });
}
