//! Error types for registration and dispatch.
//!
//! The mediator contributes a small, closed set of error kinds of its own
//! (missing handler, duplicate registration, invalid argument, mismatched
//! chain outcome). Everything a handler or behavior raises travels through
//! [`MediatorError::Application`] untouched: the display is transparent and
//! the original error stays reachable via [`MediatorError::downcast_ref`].

use crate::request::RequestKind;
use thiserror::Error;

/// Boxed error raised by application code (handlers and behaviors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by [`Handler::handle`](crate::handler::Handler::handle).
pub type HandlerResult<T> = std::result::Result<T, BoxError>;

/// Result type alias using [`MediatorError`].
pub type Result<T> = std::result::Result<T, MediatorError>;

/// Errors produced by the registry, the pipeline and the mediator.
#[derive(Error, Debug)]
pub enum MediatorError {
    /// No handler is bound to the request's type at dispatch time.
    ///
    /// Always surfaced to the caller; the mediator never retries.
    #[error("No handler registered for {kind} `{request}`")]
    HandlerNotFound {
        /// Type name of the request
        request: &'static str,
        /// Whether the request is a command or a query
        kind: RequestKind,
    },

    /// `register` was called for a type that already has a handler.
    ///
    /// The registry is left unchanged: the original handler stays bound.
    #[error("A handler is already registered for {kind} `{request}`")]
    DuplicateHandler {
        /// Type name of the request
        request: &'static str,
        /// Whether the request is a command or a query
        kind: RequestKind,
    },

    /// An argument passed to the registration or dispatch API is unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A behavior substituted a result whose type is not the request's output type.
    #[error("Pipeline returned a result of the wrong type for `{request}` (expected `{expected}`)")]
    OutcomeMismatch {
        /// Type name of the request
        request: &'static str,
        /// Type name of the declared output
        expected: &'static str,
    },

    /// Error raised by a handler or a behavior, carried unchanged.
    #[error(transparent)]
    Application(BoxError),
}

impl MediatorError {
    /// Wrap an application error raised inside a handler or a behavior.
    pub fn application<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Application(error.into())
    }

    /// Build an [`InvalidArgument`](Self::InvalidArgument) error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns `true` for [`HandlerNotFound`](Self::HandlerNotFound).
    #[must_use]
    pub const fn is_handler_not_found(&self) -> bool {
        matches!(self, Self::HandlerNotFound { .. })
    }

    /// Returns `true` for [`DuplicateHandler`](Self::DuplicateHandler).
    #[must_use]
    pub const fn is_duplicate_handler(&self) -> bool {
        matches!(self, Self::DuplicateHandler { .. })
    }

    /// Borrow the application error as `E`, if that is what was raised.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Application(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Take the application error back out, if this is one.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged when the error was produced by the mediator
    /// itself rather than by application code.
    pub fn into_application(self) -> std::result::Result<BoxError, Self> {
        match self {
            Self::Application(inner) => Ok(inner),
            other => Err(other),
        }
    }
}
