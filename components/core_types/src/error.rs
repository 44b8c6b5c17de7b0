//! Failure reasons.
//!
//! A [`JsError`] is what a rejected promise carries and what a generator body
//! throws. It is a plain value: cloning it is cheap enough and two errors
//! compare equal when kind, message and payload agree.

use std::fmt;

use crate::Value;

/// The kind of failure.
///
/// These mirror the built-in error constructors a script would observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A plain `Error`, also used for arbitrary thrown values
    Error,
    /// Type error (e.g. self-resolution, a missing iterator method)
    TypeError,
    /// Value out of allowed range
    RangeError,
    /// Several failures bundled together (`Promise.any`)
    AggregateError,
    /// Internal engine error (malformed try-entry tables and the like)
    InternalError,
}

impl ErrorKind {
    /// The constructor name a script would see.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::AggregateError => "AggregateError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure with kind, message and an optional thrown payload.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError, Value};
///
/// let error = JsError::type_error("undefined is not a function");
/// assert_eq!(error.message, "undefined is not a function");
///
/// let thrown = JsError::thrown(Value::Smi(7));
/// assert_eq!(thrown.kind, ErrorKind::Error);
/// assert_eq!(thrown.to_value(), Value::Smi(7));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The thrown value, when something other than an error object was thrown
    pub value: Option<Value>,
}

impl JsError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            value: None,
        }
    }

    /// Creates a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates an `InternalError`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Wraps an arbitrary thrown value.
    pub fn thrown(value: Value) -> Self {
        Self {
            kind: ErrorKind::Error,
            message: value.to_string(),
            value: Some(value),
        }
    }

    /// Attaches a payload value to this error.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// The value a `catch` clause would bind: the payload if there is one,
    /// otherwise the message.
    pub fn to_value(&self) -> Value {
        match &self.value {
            Some(value) => value.clone(),
            None => Value::String(self.message.clone()),
        }
    }
}
