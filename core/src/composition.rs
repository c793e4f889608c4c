//! Chain composition: the continuation passed to behaviors and middleware.
//!
//! An active chain is a slice of links (behaviors or middleware) plus a
//! terminal invocation that calls the handler. [`Next::run`] calls the first
//! remaining link with a `Next` over the rest of the slice, or the terminal
//! once the slice is exhausted, so the first link is the outermost wrapper:
//!
//! ```text
//! links [A, B, C]:   A.before → B.before → C.before → handler
//!                    → C.after → B.after → A.after
//! ```
//!
//! `Next` is consumed by `run`, so a link can let the rest of the chain run at
//! most once. Not calling `run` at all short-circuits the chain.

use crate::behavior::Behavior;
use crate::error::Result;
use crate::middleware::Middleware;
use crate::request::RequestRef;
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased result travelling through a chain.
///
/// Behaviors receive the handler's result as an `Outcome` from
/// [`Next::run`] and may inspect it, modify it in place, or return a
/// different one. The mediator downcasts the final outcome back to the
/// request's output type.
pub struct Outcome(Box<dyn Any + Send>);

impl Outcome {
    /// Wrap a result value.
    #[must_use]
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// `true` if the outcome holds a `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Borrow the value as `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Mutably borrow the value as `T`.
    #[must_use]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.downcast_mut::<T>()
    }

    /// Take the value out as `T`.
    ///
    /// # Errors
    ///
    /// Returns the outcome unchanged if it does not hold a `T`.
    pub fn downcast<T: 'static>(self) -> std::result::Result<T, Self> {
        self.0.downcast::<T>().map(|value| *value).map_err(Self)
    }

    /// Replace a `T` value with `f(value)`; other values pass through untouched.
    #[must_use]
    pub fn map<T, F>(self, f: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce(T) -> T,
    {
        match self.downcast::<T>() {
            Ok(value) => Self::new(f(value)),
            Err(other) => other,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome").finish_non_exhaustive()
    }
}

/// One element of an active chain.
#[derive(Clone)]
pub(crate) enum Link {
    Behavior(Arc<dyn Behavior>),
    Middleware(Arc<dyn Middleware>),
}

impl Link {
    fn invoke(&self, request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
        match self {
            Self::Behavior(behavior) => behavior.handle(request, next),
            Self::Middleware(middleware) => middleware.handle(request, next),
        }
    }
}

/// Links active for one dispatch. Most pipelines are short, so they stay inline.
pub(crate) type ActiveChain = SmallVec<[Link; 8]>;

/// Terminal invocation: calls the handler and wraps its result.
pub type Terminal<'a> = dyn Fn() -> Result<Outcome> + 'a;

/// Continuation handed to a behavior: "the rest of the chain".
pub struct Next<'a> {
    request: RequestRef<'a>,
    links: &'a [Link],
    terminal: &'a Terminal<'a>,
}

impl<'a> Next<'a> {
    pub(crate) const fn new(
        request: RequestRef<'a>,
        links: &'a [Link],
        terminal: &'a Terminal<'a>,
    ) -> Self {
        Self {
            request,
            links,
            terminal,
        }
    }

    /// Run the rest of the chain and return its outcome.
    ///
    /// # Errors
    ///
    /// Propagates whatever error an inner link or the handler produced.
    pub fn run(self) -> Result<Outcome> {
        match self.links.split_first() {
            Some((link, rest)) => link.invoke(self.request, Next::new(self.request, rest, self.terminal)),
            None => (self.terminal)(),
        }
    }

    /// Number of links between this point and the handler.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.links.len()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("request", &self.request)
            .field("remaining", &self.links.len())
            .finish()
    }
}

/// Run `links` around `terminal`; an empty chain calls the terminal directly.
pub(crate) fn run_chain(request: RequestRef<'_>, links: &[Link], terminal: &Terminal<'_>) -> Result<Outcome> {
    if links.is_empty() {
        return terminal();
    }
    Next::new(request, links, terminal).run()
}
