//! Lifecycle hooks that emit `tracing` events.

use cqrs_mediator_core::hooks::MediatorHooks;
use cqrs_mediator_core::{MediatorError, RequestRef};
use std::any::Any;

/// Hooks that log the request lifecycle
///
/// `before` and `after` log at `trace`. A missing handler is a wiring mistake
/// and is logged at `warn`; any other failure is logged at `debug`, leaving
/// failure reporting to [`LoggingBehavior`](crate::logging::LoggingBehavior).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

impl MediatorHooks for TracingHooks {
    fn before(&self, request: RequestRef<'_>) {
        tracing::trace!(request = request.name(), kind = %request.kind(), "Dispatching request");
    }

    fn after(&self, request: RequestRef<'_>, _output: &dyn Any) {
        tracing::trace!(request = request.name(), kind = %request.kind(), "Request handled");
    }

    fn on_error(&self, request: RequestRef<'_>, error: &MediatorError) {
        if error.is_handler_not_found() {
            tracing::warn!(request = request.name(), kind = %request.kind(), "No handler registered");
        } else {
            tracing::debug!(
                request = request.name(),
                kind = %request.kind(),
                error = %error,
                "Request returned an error"
            );
        }
    }
}
