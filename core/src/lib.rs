//! # CQRS Mediator Core
//!
//! Request mediation for command/query separated applications.
//!
//! Callers hand a request object to the [`Mediator`]; the mediator resolves
//! the single handler registered for that request's exact type, optionally
//! threads the request through an ordered chain of cross-cutting behaviors,
//! and returns the handler's result. Callers depend only on request types,
//! never on handler implementations.
//!
//! ## Core Concepts
//!
//! - **Request**: a command (mutates state) or a query (reads state), with a declared output type
//! - **Handler**: produces the output for exactly one request type
//! - **`ContextualHandler`**: a handler that also receives per-call context, reached via
//!   `dispatch_with` / `send_with`
//! - **`HandlerRegistry`**: one handler per request type, strict about duplicates
//! - **Behavior / Middleware**: wrappers around handler invocation, composed outermost-first
//! - **Pipeline**: direct calls, categorised behaviors, or filtered middleware
//! - **Hooks**: observers of every dispatch
//!
//! ## Example
//!
//! ```
//! use cqrs_mediator_core::behavior::{behavior_fn, BehaviorCategory};
//! use cqrs_mediator_core::handler::handler_fn;
//! use cqrs_mediator_core::{command, Mediator};
//!
//! struct Greet(String);
//! command!(Greet => String);
//!
//! # fn main() -> cqrs_mediator_core::Result<()> {
//! let mediator = Mediator::builder()
//!     .handler(handler_fn(|g: &Greet| Ok(format!("hi {}", g.0))))
//!     .behavior(
//!         BehaviorCategory::Global,
//!         behavior_fn(|_request, next| Ok(next.run()?.map(|s: String| s + "!"))),
//!     )
//!     .build()?;
//!
//! assert_eq!(mediator.dispatch(Greet("sam".into()))?, "hi sam!");
//! # Ok(())
//! # }
//! ```

/// Requests, request kinds and type tokens
pub mod request;

/// Declarative macros for declaring commands and queries
pub mod request_macros;

/// Handler traits and closure adapters
pub mod handler;

/// Handler registry and manifests
pub mod registry;

/// Chain continuation and type-erased outcomes
pub mod composition;

/// Pipeline behaviors
pub mod behavior;

/// Conditional middleware
pub mod middleware;

/// Behavior and middleware chains
pub mod pipeline;

/// Lifecycle hooks
pub mod hooks;

/// Mediator and builder
pub mod mediator;

/// Error types
pub mod error;

pub use behavior::{Behavior, BehaviorCategory};
pub use composition::{Next, Outcome};
pub use error::{BoxError, HandlerResult, MediatorError, Result};
pub use handler::{ContextualHandler, Handler, contextual_fn, handler_fn};
pub use hooks::MediatorHooks;
pub use mediator::{Mediator, MediatorBuilder};
pub use middleware::Middleware;
pub use pipeline::{BehaviorChain, BehaviorId, MiddlewareChain, Pipeline};
pub use registry::{HandlerManifest, HandlerRegistry};
pub use request::{Command, Query, Request, RequestKind, RequestRef, RequestType};
