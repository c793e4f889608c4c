//! Request types: commands, queries and the type tokens that key the registry.
//!
//! A request is a plain value describing an intended operation. It is either a
//! [`Command`] (changes state) or a [`Query`] (reads state), and it declares the
//! type of the result its handler produces through [`Request::Output`].
//!
//! The [`command!`](crate::command) and [`query!`](crate::query) macros
//! implement both traits consistently:
//!
//! ```
//! use cqrs_mediator_core::{command, query};
//!
//! struct Greet {
//!     name: String,
//! }
//! command!(Greet => String);
//!
//! struct CountGreetings;
//! query!(CountGreetings => usize);
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The two disjoint request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// State-changing request
    Command,
    /// Read-only request
    Query,
}

impl RequestKind {
    /// Lower-case label, used in error messages, log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request routed by the mediator to exactly one handler.
///
/// Implement it through [`Command`] or [`Query`] (or the `command!`/`query!`
/// macros); `KIND` must agree with the marker trait, which the mediator checks
/// before any lookup.
pub trait Request: Send + Sync + 'static {
    /// Result produced by the request's handler
    type Output: Send + 'static;

    /// Whether this request is a command or a query
    const KIND: RequestKind;
}

/// Marker for state-changing requests.
pub trait Command: Request {}

/// Marker for read-only requests.
pub trait Query: Request {}

/// Stable type token identifying a request type.
///
/// Equality and hashing use the [`TypeId`] only; the name and kind are carried
/// along for diagnostics and behavior selection.
#[derive(Debug, Clone, Copy)]
pub struct RequestType {
    id: TypeId,
    name: &'static str,
    kind: RequestKind,
}

impl RequestType {
    /// Type token for `R`.
    #[must_use]
    pub fn of<R: Request>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: std::any::type_name::<R>(),
            kind: R::KIND,
        }
    }

    /// The underlying [`TypeId`].
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name of the request.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths removed (`Greet` for `app::commands::Greet`).
    ///
    /// Generic arguments are kept and shortened the same way, so
    /// `app::Envelope<app::Order>` becomes `Envelope<Order>`.
    #[must_use]
    pub fn short_name(&self) -> Cow<'static, str> {
        if !self.name.contains('<') {
            return Cow::Borrowed(self.name.rsplit("::").next().unwrap_or(self.name));
        }

        let mut short = String::with_capacity(self.name.len());
        let mut segment_start = 0;
        let mut chars = self.name.chars().peekable();
        while let Some(c) = chars.next() {
            if c == ':' && chars.peek() == Some(&':') {
                chars.next();
                short.truncate(segment_start);
            } else {
                short.push(c);
                if !(c.is_alphanumeric() || c == '_') {
                    segment_start = short.len();
                }
            }
        }
        Cow::Owned(short)
    }

    /// Declared kind of the request.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }
}

impl PartialEq for RequestType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RequestType {}

impl Hash for RequestType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind, self.name)
    }
}

/// Borrowed, type-erased view of the request being dispatched.
///
/// Behaviors and middleware receive this instead of the concrete request so
/// that one behavior can wrap every request type.
#[derive(Clone, Copy)]
pub struct RequestRef<'a> {
    request_type: RequestType,
    value: &'a (dyn Any + Send + Sync),
}

impl<'a> RequestRef<'a> {
    /// View `request` as an erased request.
    #[must_use]
    pub fn new<R: Request>(request: &'a R) -> Self {
        Self {
            request_type: RequestType::of::<R>(),
            value: request,
        }
    }

    /// Type token of the request.
    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Kind of the request.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.request_type.kind
    }

    /// Fully qualified type name of the request.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.request_type.name
    }

    /// `true` when the request is a command.
    #[must_use]
    pub fn is_command(&self) -> bool {
        self.request_type.kind == RequestKind::Command
    }

    /// `true` when the request is a query.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.request_type.kind == RequestKind::Query
    }

    /// `true` when the request is an `R`.
    #[must_use]
    pub fn is<R: Request>(&self) -> bool {
        self.value.is::<R>()
    }

    /// Borrow the concrete request if it is an `R`.
    #[must_use]
    pub fn downcast_ref<R: Request>(&self) -> Option<&'a R> {
        self.value.downcast_ref::<R>()
    }
}

impl fmt::Debug for RequestRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestRef")
            .field("request_type", &self.request_type)
            .finish_non_exhaustive()
    }
}
