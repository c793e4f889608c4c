//! Declarative macros for declaring request types
//!
//! These macros implement [`Request`](crate::request::Request) together with the
//! matching [`Command`](crate::request::Command) or [`Query`](crate::request::Query)
//! marker, so the declared kind can never disagree with the marker trait.

/// Declare one or more types as commands
///
/// # Example
///
/// ```rust
/// use cqrs_mediator_core::command;
///
/// struct PlaceOrder {
///     sku: String,
/// }
/// struct CancelOrder(u64);
///
/// command! {
///     PlaceOrder => u64,
///     CancelOrder => (),
/// }
/// ```
#[macro_export]
macro_rules! command {
    ($($request:ty => $output:ty),+ $(,)?) => {
        $(
            impl $crate::request::Request for $request {
                type Output = $output;
                const KIND: $crate::request::RequestKind = $crate::request::RequestKind::Command;
            }

            impl $crate::request::Command for $request {}
        )+
    };
}

/// Declare one or more types as queries
///
/// # Example
///
/// ```rust
/// use cqrs_mediator_core::query;
///
/// struct OrderTotal(u64);
///
/// query!(OrderTotal => Option<u64>);
/// ```
#[macro_export]
macro_rules! query {
    ($($request:ty => $output:ty),+ $(,)?) => {
        $(
            impl $crate::request::Request for $request {
                type Output = $output;
                const KIND: $crate::request::RequestKind = $crate::request::RequestKind::Query;
            }

            impl $crate::request::Query for $request {}
        )+
    };
}
