//! Iterator result records.

use std::rc::Rc;

use crate::{JsError, Value};

/// Iterator result object `{ value, done }`.
#[derive(Debug, Clone, PartialEq)]
pub struct IteratorResult {
    /// The value produced by the iterator
    pub value: Value,
    /// Whether the iterator is exhausted
    pub done: bool,
}

impl IteratorResult {
    /// Creates a not-done result carrying a value.
    pub fn value(v: Value) -> Self {
        IteratorResult {
            value: v,
            done: false,
        }
    }

    /// Creates a done result with an undefined value.
    pub fn done() -> Self {
        IteratorResult {
            value: Value::Undefined,
            done: true,
        }
    }

    /// Creates a done result with a final value.
    pub fn done_with_value(v: Value) -> Self {
        IteratorResult {
            value: v,
            done: true,
        }
    }

    /// Wraps the record into a [`Value`].
    pub fn to_value(&self) -> Value {
        Value::IterResult(Rc::new(self.clone()))
    }

    /// Reads a record back out of a [`Value`].
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when the value is not an iterator result.
    pub fn from_value(value: &Value) -> Result<Self, JsError> {
        match value {
            Value::IterResult(result) => Ok(result.as_ref().clone()),
            other => Err(JsError::type_error(format!(
                "Iterator result {} is not an object",
                other
            ))),
        }
    }
}
