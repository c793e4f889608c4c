//! The mediator: resolves a request's handler and runs it through the pipeline.
//!
//! # Dispatch steps
//!
//! For every `dispatch` (command) or `send` (query):
//!
//! 1. The request's declared kind is checked against the entry point used
//! 2. [`MediatorHooks::before`] runs
//! 3. The handler bound to the request's type is looked up; none is an error.
//!    `dispatch_with` / `send_with` prefer a contextual handler and fall back
//!    to the plain one
//! 4. The active chain is taken from the [`Pipeline`]. With no active links
//!    the handler is called directly; otherwise the chain runs around a
//!    terminal that calls the handler
//! 5. The chain's outcome is downcast to the request's output type
//! 6. [`MediatorHooks::after`] or [`MediatorHooks::on_error`] runs
//!
//! Nothing is held locked while handlers, behaviors or hooks run.

use crate::behavior::{Behavior, BehaviorCategory, DEFAULT_ORDER};
use crate::composition::{Outcome, run_chain};
use crate::error::{HandlerResult, MediatorError, Result};
use crate::handler::{ContextualHandler, Handler};
use crate::hooks::{CompositeHooks, MediatorHooks, NoopHooks};
use crate::middleware::Middleware;
use crate::pipeline::{BehaviorChain, MiddlewareChain, Pipeline};
use crate::registry::{HandlerManifest, HandlerRegistry};
use crate::request::{Command, Query, Request, RequestKind, RequestRef};
use std::fmt;
use std::sync::Arc;

/// Routes commands and queries to their handlers
///
/// Cloning is cheap: clones share the registry, the pipeline and the hooks.
///
/// ## Example
///
/// ```
/// use cqrs_mediator_core::command;
/// use cqrs_mediator_core::handler::handler_fn;
/// use cqrs_mediator_core::mediator::Mediator;
///
/// struct Greet(String);
/// command!(Greet => String);
///
/// let mediator = Mediator::builder()
///     .handler(handler_fn(|g: &Greet| Ok(format!("hi {}", g.0))))
///     .build()
///     .ok();
///
/// let greeting = mediator.and_then(|m| m.dispatch(Greet("sam".into())).ok());
/// assert_eq!(greeting.as_deref(), Some("hi sam"));
/// ```
#[derive(Clone)]
pub struct Mediator {
    registry: HandlerRegistry,
    pipeline: Pipeline,
    hooks: Arc<dyn MediatorHooks>,
}

impl Mediator {
    /// Create a mediator that calls handlers directly
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_pipeline(registry, Pipeline::Direct)
    }

    /// Create a mediator that runs handlers through `pipeline`
    #[must_use]
    pub fn with_pipeline(registry: HandlerRegistry, pipeline: impl Into<Pipeline>) -> Self {
        Self {
            registry,
            pipeline: pipeline.into(),
            hooks: Arc::new(NoopHooks),
        }
    }

    /// Replace the lifecycle hooks
    #[must_use]
    pub fn with_hooks<H: MediatorHooks>(mut self, hooks: H) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Start assembling a mediator
    #[must_use]
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// The registry handlers are resolved from
    #[must_use]
    pub const fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The pipeline handlers run through
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Dispatch a command to its handler
    ///
    /// # Errors
    ///
    /// - [`MediatorError::InvalidArgument`] if `C` declares itself a query
    /// - [`MediatorError::HandlerNotFound`] if no handler is bound to `C`
    /// - [`MediatorError::OutcomeMismatch`] if a behavior replaced the result
    ///   with a value of another type
    /// - [`MediatorError::Application`] with whatever the handler or a
    ///   behavior raised
    pub fn dispatch<C: Command>(&self, command: C) -> Result<C::Output> {
        self.process(&command, RequestKind::Command, |view| {
            self.resolve(&command, view)
        })
    }

    /// Dispatch a command together with per-call context
    ///
    /// The contextual handler bound to `C` receives `context`. Without one,
    /// the plain handler runs and the context is ignored. The pipeline and
    /// hooks apply exactly as for [`Mediator::dispatch`].
    ///
    /// # Errors
    ///
    /// Same as [`Mediator::dispatch`]. Also returns
    /// [`MediatorError::InvalidArgument`] if the contextual handler bound to
    /// `C` takes a context type other than `X`.
    pub fn dispatch_with<C: Command, X: 'static>(&self, command: C, context: &X) -> Result<C::Output> {
        self.process(&command, RequestKind::Command, |view| {
            self.resolve_with(&command, context, view)
        })
    }

    /// Send a query to its handler
    ///
    /// # Errors
    ///
    /// Same as [`Mediator::dispatch`], with `InvalidArgument` raised when `Q`
    /// declares itself a command.
    pub fn send<Q: Query>(&self, query: Q) -> Result<Q::Output> {
        self.process(&query, RequestKind::Query, |view| self.resolve(&query, view))
    }

    /// Send a query together with per-call context
    ///
    /// Resolution follows [`Mediator::dispatch_with`].
    ///
    /// # Errors
    ///
    /// Same as [`Mediator::dispatch_with`], with `InvalidArgument` raised when
    /// `Q` declares itself a command.
    pub fn send_with<Q: Query, X: 'static>(&self, query: Q, context: &X) -> Result<Q::Output> {
        self.process(&query, RequestKind::Query, |view| {
            self.resolve_with(&query, context, view)
        })
    }

    fn process<R, F>(&self, request: &R, entry: RequestKind, resolve: F) -> Result<R::Output>
    where
        R: Request,
        F: FnOnce(RequestRef<'_>) -> Result<R::Output>,
    {
        let view = RequestRef::new(request);
        if R::KIND != entry {
            return Err(MediatorError::invalid_argument(format!(
                "`{}` is declared as a {} but was submitted as a {entry}",
                view.name(),
                R::KIND
            )));
        }

        self.hooks.before(view);
        let result = resolve(view);
        match &result {
            Ok(output) => self.hooks.after(view, output),
            Err(error) => self.hooks.on_error(view, error),
        }
        result
    }

    fn resolve<R: Request>(&self, request: &R, view: RequestRef<'_>) -> Result<R::Output> {
        let Some(handler) = self.registry.lookup::<R>() else {
            return Err(MediatorError::HandlerNotFound {
                request: view.name(),
                kind: view.kind(),
            });
        };
        self.run::<R, _>(view, || handler.handle(request))
    }

    fn resolve_with<R: Request, X: 'static>(&self, request: &R, context: &X, view: RequestRef<'_>) -> Result<R::Output> {
        match self.registry.lookup_contextual::<R, X>()? {
            Some(handler) => self.run::<R, _>(view, || handler.handle(request, context)),
            None => self.resolve(request, view),
        }
    }

    fn run<R, F>(&self, view: RequestRef<'_>, call: F) -> Result<R::Output>
    where
        R: Request,
        F: Fn() -> HandlerResult<R::Output>,
    {
        let links = self.pipeline.active(&view);
        tracing::trace!(
            request = view.name(),
            kind = %view.kind(),
            links = links.len(),
            "Resolved handler"
        );

        if links.is_empty() {
            return call().map_err(MediatorError::Application);
        }

        let terminal = || -> Result<Outcome> {
            call()
                .map(Outcome::new)
                .map_err(MediatorError::Application)
        };
        run_chain(view, &links, &terminal)?
            .downcast::<R::Output>()
            .map_err(|_| MediatorError::OutcomeMismatch {
                request: view.name(),
                expected: std::any::type_name::<R::Output>(),
            })
    }
}

impl fmt::Debug for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("registry", &self.registry)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Composition-root helper that assembles a [`Mediator`]
///
/// Handlers, behaviors and middleware are collected first and only published
/// by [`MediatorBuilder::build`], so a failed build leaves a supplied registry
/// and pipeline untouched.
#[derive(Default)]
pub struct MediatorBuilder {
    registry: Option<HandlerRegistry>,
    manifest: HandlerManifest,
    pipeline: Option<Pipeline>,
    behaviors: Vec<(BehaviorCategory, i32, Arc<dyn Behavior>)>,
    middleware: Vec<(i32, Arc<dyn Middleware>)>,
    hooks: Vec<Arc<dyn MediatorHooks>>,
}

impl MediatorBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing registry instead of a fresh one
    #[must_use]
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register a handler at build time
    #[must_use]
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.manifest.add(handler);
        self
    }

    /// Register a contextual handler at build time
    #[must_use]
    pub fn contextual_handler<H: ContextualHandler>(mut self, handler: H) -> Self {
        self.manifest.add_contextual(handler);
        self
    }

    /// Register every handler of `manifest` at build time
    #[must_use]
    pub fn manifest(mut self, manifest: HandlerManifest) -> Self {
        self.manifest.extend(manifest);
        self
    }

    /// Use an existing pipeline; behaviors or middleware added on the builder
    /// are appended to it
    #[must_use]
    pub fn pipeline(mut self, pipeline: impl Into<Pipeline>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    /// Add a behavior with the default order
    #[must_use]
    pub fn behavior<B: Behavior>(self, category: BehaviorCategory, behavior: B) -> Self {
        self.behavior_with_order(category, DEFAULT_ORDER, behavior)
    }

    /// Add a behavior with an explicit order (lower runs outer)
    #[must_use]
    pub fn behavior_with_order<B: Behavior>(self, category: BehaviorCategory, order: i32, behavior: B) -> Self {
        self.behavior_shared(category, order, Arc::new(behavior))
    }

    /// Add a shared behavior with an explicit order
    #[must_use]
    pub fn behavior_shared(mut self, category: BehaviorCategory, order: i32, behavior: Arc<dyn Behavior>) -> Self {
        self.behaviors.push((category, order, behavior));
        self
    }

    /// Add middleware with the default order
    #[must_use]
    pub fn middleware<M: Middleware>(self, middleware: M) -> Self {
        self.middleware_with_order(DEFAULT_ORDER, middleware)
    }

    /// Add middleware with an explicit order (lower runs outer)
    #[must_use]
    pub fn middleware_with_order<M: Middleware>(self, order: i32, middleware: M) -> Self {
        self.middleware_shared(order, Arc::new(middleware))
    }

    /// Add shared middleware with an explicit order
    #[must_use]
    pub fn middleware_shared(mut self, order: i32, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push((order, middleware));
        self
    }

    /// Add lifecycle hooks; several calls fan out in call order
    #[must_use]
    pub fn hooks<H: MediatorHooks>(mut self, hooks: H) -> Self {
        self.hooks.push(Arc::new(hooks));
        self
    }

    /// Register the collected handlers and assemble the mediator
    ///
    /// # Errors
    ///
    /// - [`MediatorError::InvalidArgument`] when both behaviors and middleware
    ///   were supplied, or when they do not match the supplied pipeline
    /// - [`MediatorError::DuplicateHandler`] when a handler conflicts with
    ///   another one or with the registry; no handler is registered then
    pub fn build(self) -> Result<Mediator> {
        let pipeline = self.target_pipeline()?;

        let registry = self.registry.unwrap_or_default();
        registry.register_manifest(self.manifest)?;

        match &pipeline {
            Pipeline::Behaviors(chain) => {
                for (category, order, behavior) in self.behaviors {
                    chain.add_shared(category, order, behavior);
                }
            }
            Pipeline::Middleware(chain) => {
                for (order, middleware) in self.middleware {
                    chain.add_shared(order, middleware);
                }
            }
            Pipeline::Direct => {}
        }

        let mut hooks = self.hooks;
        let hooks: Arc<dyn MediatorHooks> = match hooks.len() {
            0 => Arc::new(NoopHooks),
            1 => hooks.remove(0),
            _ => Arc::new(hooks.into_iter().fold(CompositeHooks::new(), CompositeHooks::with_shared)),
        };

        Ok(Mediator {
            registry,
            pipeline,
            hooks,
        })
    }

    fn target_pipeline(&self) -> Result<Pipeline> {
        let has_behaviors = !self.behaviors.is_empty();
        let has_middleware = !self.middleware.is_empty();
        if has_behaviors && has_middleware {
            return Err(MediatorError::invalid_argument(
                "a mediator runs either behaviors or middleware, not both",
            ));
        }

        match self.pipeline.clone().unwrap_or_default() {
            Pipeline::Direct if has_behaviors => Ok(BehaviorChain::new().into()),
            Pipeline::Direct if has_middleware => Ok(MiddlewareChain::new().into()),
            Pipeline::Behaviors(_) if has_middleware => Err(MediatorError::invalid_argument(
                "middleware cannot be added to a behavior pipeline",
            )),
            Pipeline::Middleware(_) if has_behaviors => Err(MediatorError::invalid_argument(
                "behaviors cannot be added to a middleware pipeline",
            )),
            pipeline => Ok(pipeline),
        }
    }
}

impl fmt::Debug for MediatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatorBuilder")
            .field("handlers", &self.manifest)
            .field("behaviors", &self.behaviors.len())
            .field("middleware", &self.middleware.len())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}
