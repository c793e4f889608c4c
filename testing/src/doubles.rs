//! Test doubles for behaviors, middleware and hooks.
//!
//! The recording doubles write into a shared [`Trace`], so a test can assert
//! the exact order in which the chain ran.

use cqrs_mediator_core::composition::{Next, Outcome};
use cqrs_mediator_core::error::Result;
use cqrs_mediator_core::hooks::MediatorHooks;
use cqrs_mediator_core::{Behavior, MediatorError, Middleware, Request, RequestKind, RequestRef, RequestType};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared, ordered log of labels
///
/// Clones write to the same log.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    /// Create an empty trace
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&self, entry: impl Into<String>) {
        self.lock().push(entry.into());
    }

    /// Copy of all entries, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Take all entries, leaving the trace empty
    #[must_use]
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Behavior that records `"{label}:before"` and `"{label}:after"` around the
/// rest of the chain
#[derive(Debug, Clone)]
pub struct RecordingBehavior {
    label: String,
    trace: Trace,
}

impl RecordingBehavior {
    /// Create a recording behavior writing to `trace`
    #[must_use]
    pub fn new(label: impl Into<String>, trace: &Trace) -> Self {
        Self {
            label: label.into(),
            trace: trace.clone(),
        }
    }
}

impl Behavior for RecordingBehavior {
    fn handle(&self, _request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
        self.trace.push(format!("{}:before", self.label));
        let outcome = next.run();
        self.trace.push(format!("{}:after", self.label));
        outcome
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[derive(Debug, Clone, Copy)]
enum Filter {
    All,
    Kind(RequestKind),
    Type(RequestType),
}

/// Middleware that records like [`RecordingBehavior`] and can be restricted
/// to a request kind or type
#[derive(Debug, Clone)]
pub struct RecordingMiddleware {
    label: String,
    trace: Trace,
    filter: Filter,
}

impl RecordingMiddleware {
    /// Create recording middleware that applies to every request
    #[must_use]
    pub fn new(label: impl Into<String>, trace: &Trace) -> Self {
        Self {
            label: label.into(),
            trace: trace.clone(),
            filter: Filter::All,
        }
    }

    /// Only apply to requests of `kind`
    #[must_use]
    pub const fn only(mut self, kind: RequestKind) -> Self {
        self.filter = Filter::Kind(kind);
        self
    }

    /// Only apply to requests of type `R`
    #[must_use]
    pub fn only_for<R: Request>(mut self) -> Self {
        self.filter = Filter::Type(RequestType::of::<R>());
        self
    }
}

impl Middleware for RecordingMiddleware {
    fn handle(&self, _request: RequestRef<'_>, next: Next<'_>) -> Result<Outcome> {
        self.trace.push(format!("{}:before", self.label));
        let outcome = next.run();
        self.trace.push(format!("{}:after", self.label));
        outcome
    }

    fn applies(&self, request: &RequestRef<'_>) -> bool {
        match self.filter {
            Filter::All => true,
            Filter::Kind(kind) => request.kind() == kind,
            Filter::Type(request_type) => request.request_type() == request_type,
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Behavior that returns a fixed value without running the rest of the chain
#[derive(Debug, Clone)]
pub struct ShortCircuit<T> {
    value: T,
}

impl<T> ShortCircuit<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Short-circuit every request with `value`
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Behavior for ShortCircuit<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn handle(&self, _request: RequestRef<'_>, _next: Next<'_>) -> Result<Outcome> {
        Ok(Outcome::new(self.value.clone()))
    }

    fn name(&self) -> &'static str {
        "short_circuit"
    }
}

/// Behavior that fails every request with an application error
#[derive(Debug, Clone)]
pub struct Reject {
    message: String,
}

impl Reject {
    /// Fail every request with `message`
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Behavior for Reject {
    fn handle(&self, _request: RequestRef<'_>, _next: Next<'_>) -> Result<Outcome> {
        Err(MediatorError::application(self.message.clone()))
    }

    fn name(&self) -> &'static str {
        "reject"
    }
}

#[derive(Debug, Default)]
struct Counts {
    before: AtomicUsize,
    after: AtomicUsize,
    errors: AtomicUsize,
}

/// Hooks that count lifecycle events
///
/// Clones share the counters, so keep one clone and hand the other to the
/// mediator.
#[derive(Debug, Clone, Default)]
pub struct CountingHooks {
    counts: Arc<Counts>,
}

impl CountingHooks {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `before` calls
    #[must_use]
    pub fn before_count(&self) -> usize {
        self.counts.before.load(Ordering::SeqCst)
    }

    /// Number of `after` calls
    #[must_use]
    pub fn after_count(&self) -> usize {
        self.counts.after.load(Ordering::SeqCst)
    }

    /// Number of `on_error` calls
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.counts.errors.load(Ordering::SeqCst)
    }
}

impl MediatorHooks for CountingHooks {
    fn before(&self, _request: RequestRef<'_>) {
        self.counts.before.fetch_add(1, Ordering::SeqCst);
    }

    fn after(&self, _request: RequestRef<'_>, _output: &dyn Any) {
        self.counts.after.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, _request: RequestRef<'_>, _error: &MediatorError) {
        self.counts.errors.fetch_add(1, Ordering::SeqCst);
    }
}
