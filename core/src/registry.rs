//! Handler registry keyed by request type
//!
//! The registry provides:
//! - Strict one-handler-per-request-type registration
//! - Thread-safe lookup while registrations change at runtime
//! - Atomic bulk registration from a [`HandlerManifest`]
//! - A separate binding per request type for [`ContextualHandler`]s
//! - Introspection of the bound request types

use crate::error::{MediatorError, Result};
use crate::handler::{ContextualHandler, Handler};
use crate::request::{Request, RequestType};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared handle to a handler for requests of type `R`.
pub type SharedHandler<R> = Arc<dyn Handler<Request = R>>;

/// Shared handle to a contextual handler for requests of type `R` with context `C`.
pub type SharedContextualHandler<R, C> = Arc<dyn ContextualHandler<Request = R, Context = C>>;

/// A handler erased to `Any`, together with the request type it is bound to.
///
/// The erased value is always a `SharedHandler<R>` for the `R` named by
/// `request_type`.
#[derive(Clone)]
struct Registration {
    request_type: RequestType,
    handler: Arc<dyn Any + Send + Sync>,
}

impl Registration {
    fn new<H: Handler>(handler: Arc<H>) -> Self {
        let shared: SharedHandler<H::Request> = handler;
        Self {
            request_type: RequestType::of::<H::Request>(),
            handler: Arc::new(shared),
        }
    }

    fn typed<R: Request>(&self) -> Option<SharedHandler<R>> {
        self.handler.downcast_ref::<SharedHandler<R>>().cloned()
    }
}

/// A contextual handler erased to `Any`, with its request and context types.
///
/// The erased value is always a `SharedContextualHandler<R, C>` for the `R`
/// named by `request_type` and the `C` identified by `context_id`.
#[derive(Clone)]
struct ContextualRegistration {
    request_type: RequestType,
    context_id: TypeId,
    context_name: &'static str,
    handler: Arc<dyn Any + Send + Sync>,
}

impl ContextualRegistration {
    fn new<H: ContextualHandler>(handler: Arc<H>) -> Self {
        let shared: SharedContextualHandler<H::Request, H::Context> = handler;
        Self {
            request_type: RequestType::of::<H::Request>(),
            context_id: TypeId::of::<H::Context>(),
            context_name: std::any::type_name::<H::Context>(),
            handler: Arc::new(shared),
        }
    }

    fn typed<R: Request, C: 'static>(&self) -> Result<SharedContextualHandler<R, C>> {
        if self.context_id != TypeId::of::<C>() {
            return Err(MediatorError::invalid_argument(format!(
                "contextual handler for {} expects context `{}`, got `{}`",
                self.request_type,
                self.context_name,
                std::any::type_name::<C>()
            )));
        }
        self.handler
            .downcast_ref::<SharedContextualHandler<R, C>>()
            .cloned()
            .ok_or_else(|| {
                MediatorError::invalid_argument(format!(
                    "contextual handler registered for {} has another request type",
                    self.request_type
                ))
            })
    }
}

/// Explicit list of handlers assembled by the composition root.
///
/// A manifest replaces scanning-based discovery: the application lists its
/// handlers once and registers them in one step with
/// [`HandlerRegistry::register_manifest`].
///
/// ## Example
///
/// ```
/// use cqrs_mediator_core::{command, query};
/// use cqrs_mediator_core::handler::handler_fn;
/// use cqrs_mediator_core::registry::{HandlerManifest, HandlerRegistry};
///
/// struct Deposit(u64);
/// struct Balance;
/// command!(Deposit => u64);
/// query!(Balance => u64);
///
/// let manifest = HandlerManifest::new()
///     .with(handler_fn(|d: &Deposit| Ok(d.0)))
///     .with(handler_fn(|_: &Balance| Ok(0)));
///
/// let registry = HandlerRegistry::new();
/// registry.register_manifest(manifest).ok();
/// assert_eq!(registry.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct HandlerManifest {
    entries: Vec<Registration>,
    contextual: Vec<ContextualRegistration>,
}

impl HandlerManifest {
    /// Create an empty manifest
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            contextual: Vec::new(),
        }
    }

    /// Add a handler (builder style)
    #[must_use]
    pub fn with<H: Handler>(mut self, handler: H) -> Self {
        self.add(handler);
        self
    }

    /// Add a handler the caller keeps a reference to (builder style)
    #[must_use]
    pub fn with_shared<H: Handler>(mut self, handler: Arc<H>) -> Self {
        self.entries.push(Registration::new(handler));
        self
    }

    /// Add a handler
    pub fn add<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.entries.push(Registration::new(Arc::new(handler)));
        self
    }

    /// Add a contextual handler (builder style)
    #[must_use]
    pub fn with_contextual<H: ContextualHandler>(mut self, handler: H) -> Self {
        self.add_contextual(handler);
        self
    }

    /// Add a contextual handler
    pub fn add_contextual<H: ContextualHandler>(&mut self, handler: H) -> &mut Self {
        self.contextual
            .push(ContextualRegistration::new(Arc::new(handler)));
        self
    }

    /// Append every entry of `other`
    pub fn extend(&mut self, other: Self) -> &mut Self {
        self.entries.extend(other.entries);
        self.contextual.extend(other.contextual);
        self
    }

    /// Request types of the plain handlers listed, in insertion order
    #[must_use]
    pub fn request_types(&self) -> Vec<RequestType> {
        self.entries.iter().map(|entry| entry.request_type).collect()
    }

    /// Request types of the contextual handlers listed, in insertion order
    #[must_use]
    pub fn contextual_request_types(&self) -> Vec<RequestType> {
        self.contextual.iter().map(|entry| entry.request_type).collect()
    }

    /// Number of handlers listed, plain and contextual
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() + self.contextual.len()
    }

    /// `true` when no handler is listed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.contextual.is_empty()
    }
}

impl fmt::Debug for HandlerManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerManifest")
            .field("handlers", &self.request_types())
            .field("contextual", &self.contextual_request_types())
            .finish()
    }
}

/// Thread-safe handler registry
///
/// Maps each request type to at most one plain handler and, independently,
/// at most one contextual handler. Cloning the registry is cheap and yields a
/// handle to the same bindings, so the composition root can keep registering
/// while mediators dispatch.
///
/// ## Example
///
/// ```
/// use cqrs_mediator_core::command;
/// use cqrs_mediator_core::handler::handler_fn;
/// use cqrs_mediator_core::registry::HandlerRegistry;
///
/// struct Greet(String);
/// command!(Greet => String);
///
/// let registry = HandlerRegistry::new();
/// registry
///     .register(handler_fn(|g: &Greet| Ok(format!("hi {}", g.0))))
///     .ok();
///
/// assert!(registry.contains::<Greet>());
/// assert!(registry.register(handler_fn(|_: &Greet| Ok(String::new()))).is_err());
/// ```
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<RequestType, Registration>>>,
    contextual: Arc<RwLock<HashMap<RequestType, ContextualRegistration>>>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its supported request type
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::DuplicateHandler`] if the request type already
    /// has a handler. The existing binding is kept.
    pub fn register<H: Handler>(&self, handler: H) -> Result<()> {
        self.insert(Registration::new(Arc::new(handler)))
    }

    /// Register a handler the caller keeps a reference to
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::DuplicateHandler`] if the request type already
    /// has a handler.
    pub fn register_shared<H: Handler>(&self, handler: Arc<H>) -> Result<()> {
        self.insert(Registration::new(handler))
    }

    /// Register a handler under an explicitly supplied request type
    ///
    /// Used when the type tag comes from configuration or a manifest rather
    /// than from the handler itself.
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::InvalidArgument`] if `request_type` is not the
    /// handler's supported type, and [`MediatorError::DuplicateHandler`] if the
    /// type is already bound.
    pub fn register_as<H: Handler>(&self, request_type: RequestType, handler: Arc<H>) -> Result<()> {
        let supported = handler.supported_type();
        if supported != request_type {
            return Err(MediatorError::invalid_argument(format!(
                "handler for {supported} cannot be registered as {request_type}"
            )));
        }
        self.insert(Registration::new(handler))
    }

    /// Register every handler of a manifest, all or nothing
    ///
    /// Uniqueness is checked within the manifest and against the current
    /// bindings before anything is published.
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::DuplicateHandler`] for the first conflicting
    /// request type; in that case no handler from the manifest is registered.
    pub fn register_manifest(&self, manifest: HandlerManifest) -> Result<()> {
        // plain bindings are always locked before contextual ones
        let mut handlers = self.write();
        let mut contextual = self.write_contextual();

        let mut seen = HashSet::with_capacity(manifest.entries.len());
        for entry in &manifest.entries {
            if handlers.contains_key(&entry.request_type) || !seen.insert(entry.request_type) {
                return Err(rejected_manifest(entry.request_type));
            }
        }
        let mut seen = HashSet::with_capacity(manifest.contextual.len());
        for entry in &manifest.contextual {
            if contextual.contains_key(&entry.request_type) || !seen.insert(entry.request_type) {
                return Err(rejected_manifest(entry.request_type));
            }
        }

        let count = manifest.len();
        for entry in manifest.entries {
            handlers.insert(entry.request_type, entry);
        }
        for entry in manifest.contextual {
            contextual.insert(entry.request_type, entry);
        }
        drop(contextual);
        drop(handlers);

        tracing::debug!(count, "Registered handler manifest");
        Ok(())
    }

    /// Register a contextual handler for its supported request type
    ///
    /// A request type may have both a plain and a contextual handler; they
    /// are bound independently.
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::DuplicateHandler`] if the request type already
    /// has a contextual handler. The existing binding is kept.
    pub fn register_contextual<H: ContextualHandler>(&self, handler: H) -> Result<()> {
        self.register_contextual_shared(Arc::new(handler))
    }

    /// Register a contextual handler the caller keeps a reference to
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::DuplicateHandler`] if the request type already
    /// has a contextual handler.
    pub fn register_contextual_shared<H: ContextualHandler>(&self, handler: Arc<H>) -> Result<()> {
        let registration = ContextualRegistration::new(handler);
        let request_type = registration.request_type;
        {
            let mut contextual = self.write_contextual();
            if contextual.contains_key(&request_type) {
                tracing::warn!(
                    request = request_type.name(),
                    kind = %request_type.kind(),
                    "Contextual handler already registered, rejecting"
                );
                return Err(duplicate(request_type));
            }
            contextual.insert(request_type, registration);
        }

        tracing::debug!(
            request = request_type.name(),
            kind = %request_type.kind(),
            "Registered contextual handler"
        );
        Ok(())
    }

    /// Remove the contextual handler bound to `R`
    ///
    /// The plain handler for `R`, if any, is left in place.
    pub fn unregister_contextual<R: Request>(&self) -> bool {
        let request_type = RequestType::of::<R>();
        let removed = self.write_contextual().remove(&request_type).is_some();
        if removed {
            tracing::debug!(
                request = request_type.name(),
                kind = %request_type.kind(),
                "Unregistered contextual handler"
            );
        }
        removed
    }

    /// Look up the contextual handler bound to `R`, expecting context `C`
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::InvalidArgument`] if a contextual handler is
    /// bound to `R` but takes a context other than `C`.
    pub fn lookup_contextual<R: Request, C: 'static>(&self) -> Result<Option<SharedContextualHandler<R, C>>> {
        self.read_contextual()
            .get(&RequestType::of::<R>())
            .map(ContextualRegistration::typed::<R, C>)
            .transpose()
    }

    /// `true` if a contextual handler is bound to `R`
    #[must_use]
    pub fn contains_contextual<R: Request>(&self) -> bool {
        self.read_contextual().contains_key(&RequestType::of::<R>())
    }

    /// Request types with a contextual handler, sorted by type name
    #[must_use]
    pub fn contextual_request_types(&self) -> Vec<RequestType> {
        let mut types: Vec<RequestType> = self.read_contextual().keys().copied().collect();
        types.sort_by_key(RequestType::name);
        types
    }

    /// Remove the handler bound to `R`
    ///
    /// Returns `true` if a handler was removed, `false` if none was bound.
    pub fn unregister<R: Request>(&self) -> bool {
        self.unregister_type(RequestType::of::<R>())
    }

    /// Remove the handler bound to `request_type`
    ///
    /// Returns `true` if a handler was removed, `false` if none was bound.
    pub fn unregister_type(&self, request_type: RequestType) -> bool {
        let removed = self.write().remove(&request_type).is_some();
        if removed {
            tracing::debug!(
                request = request_type.name(),
                kind = %request_type.kind(),
                "Unregistered handler"
            );
        }
        removed
    }

    /// Look up the handler bound to `R`
    ///
    /// Absence is a normal outcome and is reported as `None`.
    #[must_use]
    pub fn lookup<R: Request>(&self) -> Option<SharedHandler<R>> {
        self.read()
            .get(&RequestType::of::<R>())
            .and_then(Registration::typed::<R>)
    }

    /// `true` if a handler is bound to `R`
    #[must_use]
    pub fn contains<R: Request>(&self) -> bool {
        self.contains_type(RequestType::of::<R>())
    }

    /// `true` if a handler is bound to `request_type`
    #[must_use]
    pub fn contains_type(&self, request_type: RequestType) -> bool {
        self.read().contains_key(&request_type)
    }

    /// Request types with a plain handler, sorted by type name
    #[must_use]
    pub fn request_types(&self) -> Vec<RequestType> {
        let mut types: Vec<RequestType> = self.read().keys().copied().collect();
        types.sort_by_key(RequestType::name);
        types
    }

    /// Number of bindings, plain and contextual
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len() + self.read_contextual().len()
    }

    /// `true` when nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every binding
    pub fn clear(&self) {
        let mut handlers = self.write();
        handlers.clear();
        self.write_contextual().clear();
    }

    fn insert(&self, registration: Registration) -> Result<()> {
        let request_type = registration.request_type;
        {
            let mut handlers = self.write();
            if handlers.contains_key(&request_type) {
                tracing::warn!(
                    request = request_type.name(),
                    kind = %request_type.kind(),
                    "Handler already registered, rejecting"
                );
                return Err(duplicate(request_type));
            }
            handlers.insert(request_type, registration);
        }

        tracing::debug!(
            request = request_type.name(),
            kind = %request_type.kind(),
            "Registered handler"
        );
        Ok(())
    }

    // The lock only ever guards map operations, never handler code, so a
    // poisoned lock still holds a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<RequestType, Registration>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RequestType, Registration>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_contextual(&self) -> RwLockReadGuard<'_, HashMap<RequestType, ContextualRegistration>> {
        self.contextual.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_contextual(&self) -> RwLockWriteGuard<'_, HashMap<RequestType, ContextualRegistration>> {
        self.contextual.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("request_types", &self.request_types())
            .field("contextual", &self.contextual_request_types())
            .finish()
    }
}

fn rejected_manifest(request_type: RequestType) -> MediatorError {
    tracing::warn!(
        request = request_type.name(),
        kind = %request_type.kind(),
        "Rejected manifest: duplicate handler"
    );
    duplicate(request_type)
}

const fn duplicate(request_type: RequestType) -> MediatorError {
    MediatorError::DuplicateHandler {
        request: request_type.name(),
        kind: request_type.kind(),
    }
}
