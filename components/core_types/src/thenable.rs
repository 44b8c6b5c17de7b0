//! The chaining capability.
//!
//! Anything implementing [`Thenable`] is awaitable: resolving a promise with
//! it adopts its eventual outcome instead of fulfilling with it directly.
//! The check happens once, when a value is wrapped into
//! [`Value::Awaitable`](crate::Value::Awaitable).

use std::any::Any;

use crate::{JsError, Value};

/// Callback invoked with a fulfilment value.
pub type FulfillCallback = Box<dyn FnOnce(Value)>;

/// Callback invoked with a rejection reason.
pub type RejectCallback = Box<dyn FnOnce(JsError)>;

/// A value that can be chained onto.
///
/// Implementations must call at most one of the two callbacks, but the
/// runtime never relies on that: adoption guards against a thenable that
/// calls back twice or calls both.
pub trait Thenable {
    /// Registers continuations for the eventual outcome.
    ///
    /// Returning `Err` is the equivalent of `then` itself throwing.
    fn then(&self, on_fulfilled: FulfillCallback, on_rejected: RejectCallback)
        -> Result<(), JsError>;

    /// Upcast used to recognise the runtime's own promise type.
    fn as_any(&self) -> &dyn Any;
}
