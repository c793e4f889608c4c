//! Pipeline behaviors: cross-cutting wrappers around handler invocation.
//!
//! A behavior receives the in-flight request and a [`Next`] continuation. It
//! may run code before and after `next.run()`, replace the result, or return
//! without calling `next` at all to short-circuit the handler.
//!
//! Behaviors are registered per [`BehaviorCategory`]: global behaviors wrap
//! every request and always sit outside the command- or query-specific ones.

use crate::composition::{Next, Outcome};
use crate::error::Result;
use crate::request::{RequestKind, RequestRef};
use std::fmt;

/// Order assigned to behaviors registered without an explicit order.
pub const DEFAULT_ORDER: i32 = 0;

/// A cross-cutting wrapper around handler invocation.
///
/// # Example
///
/// ```
/// use cqrs_mediator_core::behavior::Behavior;
/// use cqrs_mediator_core::composition::{Next, Outcome};
/// use cqrs_mediator_core::error::Result;
/// use cqrs_mediator_core::request::RequestRef;
///
/// struct Audit;
///
/// impl Behavior for Audit {
///     fn handle(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
///         let outcome = next.run();
///         if outcome.is_err() {
///             eprintln!("{} failed", request.name());
///         }
///         outcome
///     }
/// }
/// ```
pub trait Behavior: Send + Sync + 'static {
    /// Wrap the rest of the chain.
    ///
    /// # Errors
    ///
    /// Returns the inner chain's error unchanged, or an error of the
    /// behavior's own to short-circuit the chain.
    fn handle(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome>;

    /// Name used in logs and introspection.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Which requests a behavior applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorCategory {
    /// Every request
    Global,
    /// Commands only
    Command,
    /// Queries only
    Query,
}

impl BehaviorCategory {
    /// The category-specific category for a request kind.
    #[must_use]
    pub const fn for_kind(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Command => Self::Command,
            RequestKind::Query => Self::Query,
        }
    }

    /// `true` if behaviors of this category wrap requests of `kind`.
    #[must_use]
    pub const fn applies_to(self, kind: RequestKind) -> bool {
        matches!(
            (self, kind),
            (Self::Global, _)
                | (Self::Command, RequestKind::Command)
                | (Self::Query, RequestKind::Query)
        )
    }
}

/// Behavior backed by a closure.
///
/// Created by [`behavior_fn`].
pub struct FnBehavior<F> {
    handle: F,
}

/// Adapt a closure into a [`Behavior`].
///
/// ```
/// use cqrs_mediator_core::behavior::behavior_fn;
///
/// // Upper-cases every `String` result.
/// let shout = behavior_fn(|_request, next| {
///     Ok(next.run()?.map(|s: String| s.to_uppercase()))
/// });
/// # let _ = shout;
/// ```
pub const fn behavior_fn<F>(handle: F) -> FnBehavior<F>
where
    F: Fn(RequestRef<'_>, Next<'_>) -> Result<Outcome> + Send + Sync + 'static,
{
    FnBehavior { handle }
}

impl<F> Behavior for FnBehavior<F>
where
    F: Fn(RequestRef<'_>, Next<'_>) -> Result<Outcome> + Send + Sync + 'static,
{
    fn handle(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
        (self.handle)(request, next)
    }

    fn name(&self) -> &'static str {
        "behavior_fn"
    }
}

impl<F> fmt::Debug for FnBehavior<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBehavior").finish_non_exhaustive()
    }
}
