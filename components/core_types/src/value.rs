//! Runtime value representation.
//!
//! This module provides the core `Value` enum. Primitive values are stored
//! inline; awaitables and records are reference counted so cloning a value
//! never deep-copies shared state.

use num_bigint::BigInt;
use num_traits::Zero;
use std::fmt;
use std::rc::Rc;

use crate::{IteratorResult, Thenable};

/// Represents any value flowing through promises and generators.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let undefined = Value::Undefined;
/// let number = Value::Smi(42);
///
/// assert!(!undefined.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(number.type_of(), "number");
/// ```
#[derive(Clone)]
pub enum Value {
    /// The undefined value
    Undefined,
    /// The null value
    Null,
    /// Boolean (true or false)
    Boolean(bool),
    /// Small integer
    Smi(i32),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// String value
    String(std::string::String),
    /// Arbitrary precision integer
    BigInt(BigInt),
    /// Ordered list of values (combinator results, aggregated reasons)
    Array(Rc<Vec<Value>>),
    /// Anything exposing the chaining capability
    Awaitable(Rc<dyn Thenable>),
    /// Await marker yielded by an async body: the driver settles the wrapped
    /// value and resumes the body with the outcome instead of reporting it
    Await(Box<Value>),
    /// `{ value, done }` record
    IterResult(Rc<IteratorResult>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Smi(n) => f.debug_tuple("Smi").field(n).finish(),
            Value::Double(n) => f.debug_tuple("Double").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::BigInt(n) => f.debug_tuple("BigInt").field(n).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Awaitable(_) => write!(f, "Awaitable(...)"),
            Value::Await(inner) => f.debug_tuple("Await").field(inner).finish(),
            Value::IterResult(result) => f
                .debug_struct("IterResult")
                .field("value", &result.value)
                .field("done", &result.done)
                .finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Smi(a), Value::Smi(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            // Identity, not structure: two awaitables are equal only if they
            // are the same object.
            (Value::Awaitable(a), Value::Awaitable(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (Value::Await(a), Value::Await(b)) => a == b,
            (Value::IterResult(a), Value::IterResult(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Wraps a value into the await marker.
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// let marker = Value::awrap(Value::Smi(1));
    /// assert!(marker.is_await());
    /// ```
    pub fn awrap(value: Value) -> Value {
        Value::Await(Box::new(value))
    }

    /// Builds an array value.
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(items))
    }

    /// Returns whether this value is an await marker.
    pub fn is_await(&self) -> bool {
        matches!(self, Value::Await(_))
    }

    /// Returns the chaining capability if this value is awaitable.
    pub fn as_thenable(&self) -> Option<&Rc<dyn Thenable>> {
        match self {
            Value::Awaitable(thenable) => Some(thenable),
            _ => None,
        }
    }

    /// Returns whether this value is truthy.
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(!Value::Undefined.is_truthy());
    /// assert!(!Value::Smi(0).is_truthy());
    /// assert!(!Value::Double(f64::NAN).is_truthy());
    /// assert!(Value::Smi(42).is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Smi(n) => *n != 0,
            Value::Double(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::BigInt(n) => !n.is_zero(),
            Value::Array(_) | Value::Awaitable(_) | Value::Await(_) | Value::IterResult(_) => {
                true
            }
        }
    }

    /// Returns the `typeof` result for this value.
    pub fn type_of(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "object".to_string(),
            Value::Boolean(_) => "boolean".to_string(),
            Value::Smi(_) | Value::Double(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::BigInt(_) => "bigint".to_string(),
            Value::Array(_) | Value::Awaitable(_) | Value::Await(_) | Value::IterResult(_) => {
                "object".to_string()
            }
        }
    }

    /// Returns the small integer payload, if any.
    pub fn as_smi(&self) -> Option<i32> {
        match self {
            Value::Smi(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Smi(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// String conversion.
///
/// ```
/// use core_types::Value;
///
/// assert_eq!(Value::Undefined.to_string(), "undefined");
/// assert_eq!(Value::Smi(42).to_string(), "42");
/// assert_eq!(Value::array(vec![Value::Smi(1), Value::Smi(2)]).to_string(), "1,2");
/// ```
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Smi(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Awaitable(_) => write!(f, "[object Promise]"),
            Value::Await(inner) => write!(f, "{}", inner),
            Value::IterResult(_) => write!(f, "[object Object]"),
        }
    }
}
