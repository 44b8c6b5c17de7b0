//! Suspendable computations.
//!
//! This crate runs compiled generator bodies: functions that pause at yield
//! points, hand out intermediate values, and later resume with a value, an
//! injected exception, or an early return. Try/catch/finally regions are
//! described by a try-entry table so exceptions and abrupt completions are
//! routed correctly across suspensions.
//!
//! # Overview
//!
//! - [`Generator`] - The state machine driving a compiled body
//! - [`Context`] - Per-generator execution state handed to the body
//! - [`TryEntry`] / [`Completion`] - Try regions and their pending completions
//! - [`Resumable`] - Capability used to delegate to inner iterators (`yield*`)
//!
//! # Examples
//!
//! A body equivalent to `try { yield 1 } finally { log.push("cleanup") }`:
//!
//! ```
//! use core_types::Value;
//! use generator_runtime::{Generator, Step, TryEntry, END};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let sink = log.clone();
//! let gen = Generator::new(
//!     move |ctx| match ctx.next {
//!         0 => {
//!             ctx.next = 1;
//!             Ok(Step::Yield(Value::Smi(1)))
//!         }
//!         1 => {
//!             ctx.next = 2;
//!             Ok(Step::Continue)
//!         }
//!         2 => {
//!             sink.borrow_mut().push("cleanup");
//!             ctx.finish(2)
//!         }
//!         _ => {
//!             ctx.next = END;
//!             Ok(Step::Continue)
//!         }
//!     },
//!     vec![TryEntry::try_finally(0, 2, 3)],
//! );
//!
//! assert_eq!(gen.next(Value::Undefined).unwrap().value, Value::Smi(1));
//! let done = gen.return_value(Value::Smi(99)).unwrap();
//! assert_eq!((done.value, done.done), (Value::Smi(99), true));
//! assert_eq!(*log.borrow(), vec!["cleanup"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod context;
pub mod generator;
pub mod iterator;

pub use context::{Completion, Context, Delegate, Loc, Step, TryEntry, END};
pub use generator::{Generator, GeneratorState, StepFn};
pub use iterator::{Resumable, Resume, ResumeKind, ValuesIterator};
