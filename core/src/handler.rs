//! Request handlers.
//!
//! A handler is bound 1:1 to the request type it supports. Implement
//! [`Handler`] on a struct when the handler carries dependencies, or adapt a
//! closure with [`handler_fn`].
//!
//! A [`ContextualHandler`] additionally receives per-call data that does not
//! belong on the request itself (caller identity, tenant, correlation id). It
//! is reached through `dispatch_with` / `send_with` on the mediator.

use crate::error::HandlerResult;
use crate::request::{Request, RequestType};
use std::fmt;
use std::marker::PhantomData;

/// Produces the result for one request type.
///
/// # Example
///
/// ```
/// use cqrs_mediator_core::command;
/// use cqrs_mediator_core::error::HandlerResult;
/// use cqrs_mediator_core::handler::Handler;
///
/// struct Greet {
///     name: String,
/// }
/// command!(Greet => String);
///
/// struct GreetHandler {
///     greeting: &'static str,
/// }
///
/// impl Handler for GreetHandler {
///     type Request = Greet;
///
///     fn handle(&self, request: &Greet) -> HandlerResult<String> {
///         Ok(format!("{} {}", self.greeting, request.name))
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// The request type this handler supports
    type Request: Request;

    /// Handle a request and produce its result.
    ///
    /// # Errors
    ///
    /// Any error returned here reaches the caller unchanged, wrapped in
    /// [`MediatorError::Application`](crate::error::MediatorError::Application).
    fn handle(&self, request: &Self::Request) -> HandlerResult<<Self::Request as Request>::Output>;

    /// Type token of the supported request type.
    fn supported_type(&self) -> RequestType {
        RequestType::of::<Self::Request>()
    }
}

/// Handler backed by a closure.
///
/// Created by [`handler_fn`].
pub struct FnHandler<R, F> {
    handle: F,
    _request: PhantomData<fn(&R)>,
}

/// Adapt a closure into a [`Handler`] for `R`.
///
/// The request type is inferred from the closure's argument:
///
/// ```
/// use cqrs_mediator_core::query;
/// use cqrs_mediator_core::handler::{handler_fn, Handler};
///
/// struct Square(i64);
/// query!(Square => i64);
///
/// let handler = handler_fn(|q: &Square| Ok(q.0 * q.0));
/// assert_eq!(handler.handle(&Square(7)).ok(), Some(49));
/// ```
pub const fn handler_fn<R, F>(handle: F) -> FnHandler<R, F>
where
    R: Request,
    F: Fn(&R) -> HandlerResult<R::Output> + Send + Sync + 'static,
{
    FnHandler {
        handle,
        _request: PhantomData,
    }
}

impl<R, F> Handler for FnHandler<R, F>
where
    R: Request,
    F: Fn(&R) -> HandlerResult<R::Output> + Send + Sync + 'static,
{
    type Request = R;

    fn handle(&self, request: &R) -> HandlerResult<R::Output> {
        (self.handle)(request)
    }
}

impl<R, F> fmt::Debug for FnHandler<R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("request", &std::any::type_name::<R>())
            .finish()
    }
}

/// Produces the result for one request type from the request and a per-call context.
///
/// # Example
///
/// ```
/// use cqrs_mediator_core::query;
/// use cqrs_mediator_core::error::HandlerResult;
/// use cqrs_mediator_core::handler::ContextualHandler;
///
/// struct ListOrders;
/// query!(ListOrders => Vec<String>);
///
/// struct Tenant(&'static str);
///
/// struct ListOrdersHandler;
///
/// impl ContextualHandler for ListOrdersHandler {
///     type Request = ListOrders;
///     type Context = Tenant;
///
///     fn handle(&self, _: &ListOrders, tenant: &Tenant) -> HandlerResult<Vec<String>> {
///         Ok(vec![format!("{}/order-1", tenant.0)])
///     }
/// }
/// ```
pub trait ContextualHandler: Send + Sync + 'static {
    /// The request type this handler supports
    type Request: Request;

    /// Per-call data supplied alongside the request
    type Context: 'static;

    /// Handle a request with its context and produce its result.
    ///
    /// # Errors
    ///
    /// Any error returned here reaches the caller unchanged, wrapped in
    /// [`MediatorError::Application`](crate::error::MediatorError::Application).
    fn handle(
        &self,
        request: &Self::Request,
        context: &Self::Context,
    ) -> HandlerResult<<Self::Request as Request>::Output>;

    /// Type token of the supported request type.
    fn supported_type(&self) -> RequestType {
        RequestType::of::<Self::Request>()
    }
}

/// Contextual handler backed by a closure.
///
/// Created by [`contextual_fn`].
pub struct FnContextualHandler<R, C, F> {
    handle: F,
    _request: PhantomData<fn(&R, &C)>,
}

/// Adapt a two-argument closure into a [`ContextualHandler`].
///
/// ```
/// use cqrs_mediator_core::command;
/// use cqrs_mediator_core::handler::{contextual_fn, ContextualHandler};
///
/// struct Rename(String);
/// command!(Rename => String);
///
/// let handler = contextual_fn(|r: &Rename, user: &String| Ok(format!("{user} renamed to {}", r.0)));
/// assert_eq!(
///     handler.handle(&Rename("b".into()), &"ann".to_string()).ok().as_deref(),
///     Some("ann renamed to b")
/// );
/// ```
pub const fn contextual_fn<R, C, F>(handle: F) -> FnContextualHandler<R, C, F>
where
    R: Request,
    C: 'static,
    F: Fn(&R, &C) -> HandlerResult<R::Output> + Send + Sync + 'static,
{
    FnContextualHandler {
        handle,
        _request: PhantomData,
    }
}

impl<R, C, F> ContextualHandler for FnContextualHandler<R, C, F>
where
    R: Request,
    C: 'static,
    F: Fn(&R, &C) -> HandlerResult<R::Output> + Send + Sync + 'static,
{
    type Request = R;
    type Context = C;

    fn handle(&self, request: &R, context: &C) -> HandlerResult<R::Output> {
        (self.handle)(request, context)
    }
}

impl<R, C, F> fmt::Debug for FnContextualHandler<R, C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnContextualHandler")
            .field("request", &std::any::type_name::<R>())
            .field("context", &std::any::type_name::<C>())
            .finish()
    }
}
