//! Lifecycle hooks around dispatch.
//!
//! Hooks observe every request the mediator processes. They run outside the
//! behavior chain and cannot change the result or suppress an error.

use crate::error::MediatorError;
use crate::request::RequestRef;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Observer of the mediator's request lifecycle.
///
/// Every method defaults to a no-op, so implementors only override what they
/// need. For one dispatch, `before` is called exactly once, followed by
/// exactly one of `after` or `on_error`.
pub trait MediatorHooks: Send + Sync + 'static {
    /// Called once the request kind has been validated, before handler lookup.
    fn before(&self, _request: RequestRef<'_>) {}

    /// Called with the result after a successful dispatch.
    ///
    /// `output` holds the request's declared output type.
    fn after(&self, _request: RequestRef<'_>, _output: &dyn Any) {}

    /// Called when dispatch fails, including when no handler is bound.
    fn on_error(&self, _request: RequestRef<'_>, _error: &MediatorError) {}
}

/// Hooks that do nothing; the mediator's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl MediatorHooks for NoopHooks {}

/// Fans every lifecycle event out to several hooks, in insertion order.
#[derive(Clone, Default)]
pub struct CompositeHooks {
    hooks: Vec<Arc<dyn MediatorHooks>>,
}

impl CompositeHooks {
    /// Create an empty composite
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append hooks (builder style)
    #[must_use]
    pub fn with<H: MediatorHooks>(mut self, hooks: H) -> Self {
        self.hooks.push(Arc::new(hooks));
        self
    }

    /// Append shared hooks (builder style)
    #[must_use]
    pub fn with_shared(mut self, hooks: Arc<dyn MediatorHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    /// Number of wrapped hooks
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// `true` when nothing is wrapped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl MediatorHooks for CompositeHooks {
    fn before(&self, request: RequestRef<'_>) {
        for hooks in &self.hooks {
            hooks.before(request);
        }
    }

    fn after(&self, request: RequestRef<'_>, output: &dyn Any) {
        for hooks in &self.hooks {
            hooks.after(request, output);
        }
    }

    fn on_error(&self, request: RequestRef<'_>, error: &MediatorError) {
        for hooks in &self.hooks {
            hooks.on_error(request, error);
        }
    }
}

impl fmt::Debug for CompositeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}
