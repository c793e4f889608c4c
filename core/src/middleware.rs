//! Conditional middleware.
//!
//! Middleware is the alternative to categorised behaviors: a single ordered
//! list where each entry decides per request, through [`Middleware::applies`],
//! whether it takes part in that request's chain.

use crate::composition::{Next, Outcome};
use crate::error::Result;
use crate::request::RequestRef;
use std::fmt;

/// A behavior with a per-request participation predicate.
pub trait Middleware: Send + Sync + 'static {
    /// Wrap the rest of the chain.
    ///
    /// # Errors
    ///
    /// Returns the inner chain's error unchanged, or an error of the
    /// middleware's own to short-circuit the chain.
    fn handle(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome>;

    /// Whether this middleware takes part in `request`'s chain.
    fn applies(&self, _request: &RequestRef<'_>) -> bool {
        true
    }

    /// Name used in logs and introspection.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Middleware backed by a predicate and a handler closure.
///
/// Created by [`middleware_fn`].
pub struct FnMiddleware<P, F> {
    applies: P,
    handle: F,
}

/// Adapt a predicate and a closure into a [`Middleware`].
///
/// ```
/// use cqrs_mediator_core::middleware::middleware_fn;
///
/// // Only wraps commands.
/// let commands_only = middleware_fn(
///     |request| request.is_command(),
///     |_request, next| next.run(),
/// );
/// # let _ = commands_only;
/// ```
pub const fn middleware_fn<P, F>(applies: P, handle: F) -> FnMiddleware<P, F>
where
    P: Fn(&RequestRef<'_>) -> bool + Send + Sync + 'static,
    F: Fn(RequestRef<'_>, Next<'_>) -> Result<Outcome> + Send + Sync + 'static,
{
    FnMiddleware { applies, handle }
}

impl<P, F> Middleware for FnMiddleware<P, F>
where
    P: Fn(&RequestRef<'_>) -> bool + Send + Sync + 'static,
    F: Fn(RequestRef<'_>, Next<'_>) -> Result<Outcome> + Send + Sync + 'static,
{
    fn handle(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
        (self.handle)(request, next)
    }

    fn applies(&self, request: &RequestRef<'_>) -> bool {
        (self.applies)(request)
    }

    fn name(&self) -> &'static str {
        "middleware_fn"
    }
}

impl<P, F> fmt::Debug for FnMiddleware<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}
