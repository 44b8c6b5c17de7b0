//! Core value types shared by the generator and promise runtimes.
//!
//! This crate provides the foundational types every other component speaks:
//! dynamic values, failure reasons, iterator result records and the
//! chaining capability that marks a value as awaitable.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`JsError`] - A failure reason carried by rejections and throws
//! - [`ErrorKind`] - Classification of failures
//! - [`IteratorResult`] - The `{ value, done }` record produced by iteration
//! - [`Thenable`] - Capability implemented by anything that can be awaited
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = JsError::type_error("undefined is not a function");
//! assert_eq!(error.kind, ErrorKind::TypeError);
//! assert_eq!(error.to_string(), "TypeError: undefined is not a function");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod iterator;
mod thenable;
mod value;

pub use error::{ErrorKind, JsError};
pub use iterator::IteratorResult;
pub use thenable::{FulfillCallback, RejectCallback, Thenable};
pub use value::Value;
