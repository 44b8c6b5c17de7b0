//! Resume operations and the iterator capability used for delegation.
//!
//! A generator forwards resume operations to its delegate through the
//! [`Resumable`] trait. Iterators declare which operations they support, so
//! a missing `throw` or `return` is detected once, at the call site, instead
//! of by probing for methods.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use core_types::{IteratorResult, JsError, Value};

/// The kind of resume operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResumeKind {
    /// `next(value?)`
    Next,
    /// `throw(exception)`
    Throw,
    /// `return(value?)`
    Return,
}

impl ResumeKind {
    /// Method name as a script would spell it.
    pub fn method_name(self) -> &'static str {
        match self {
            ResumeKind::Next => "next",
            ResumeKind::Throw => "throw",
            ResumeKind::Return => "return",
        }
    }
}

impl fmt::Display for ResumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// A resume operation together with its argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    /// Resume normally, the value becomes the result of the paused yield
    Next(Value),
    /// Raise the failure at the paused yield
    Throw(JsError),
    /// Return from the paused yield, running enclosing finally blocks
    Return(Value),
}

impl Resume {
    /// The kind of this operation.
    pub fn kind(&self) -> ResumeKind {
        match self {
            Resume::Next(_) => ResumeKind::Next,
            Resume::Throw(_) => ResumeKind::Throw,
            Resume::Return(_) => ResumeKind::Return,
        }
    }
}

/// An iterator that can be resumed with `next`, and optionally `throw` and
/// `return`.
pub trait Resumable {
    /// Whether this iterator implements the given operation.
    ///
    /// `next` is always supported.
    fn supports(&self, kind: ResumeKind) -> bool;

    /// Performs a resume operation.
    ///
    /// Callers must check [`supports`](Resumable::supports) first; an
    /// unsupported operation is a `TypeError`.
    fn resume(&self, resume: Resume) -> Result<IteratorResult, JsError>;
}

/// Iterator over a fixed list of values.
///
/// Supports `next` and `return` but not `throw`, like the iterator of a
/// plain array.
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use generator_runtime::{Resumable, Resume, ValuesIterator};
///
/// let iter = ValuesIterator::new(vec![Value::Smi(1)]);
/// assert_eq!(iter.resume(Resume::Next(Value::Undefined)).unwrap().value, Value::Smi(1));
/// assert!(iter.resume(Resume::Next(Value::Undefined)).unwrap().done);
/// ```
#[derive(Debug, Default)]
pub struct ValuesIterator {
    remaining: RefCell<VecDeque<Value>>,
}

impl ValuesIterator {
    /// Creates an iterator over `values`.
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            remaining: RefCell::new(values.into()),
        }
    }

    /// Number of values not yet produced.
    pub fn remaining(&self) -> usize {
        self.remaining.borrow().len()
    }
}

impl Resumable for ValuesIterator {
    fn supports(&self, kind: ResumeKind) -> bool {
        kind != ResumeKind::Throw
    }

    fn resume(&self, resume: Resume) -> Result<IteratorResult, JsError> {
        match resume {
            Resume::Next(_) => Ok(match self.remaining.borrow_mut().pop_front() {
                Some(value) => IteratorResult::value(value),
                None => IteratorResult::done(),
            }),
            Resume::Return(value) => {
                self.remaining.borrow_mut().clear();
                Ok(IteratorResult::done_with_value(value))
            }
            Resume::Throw(_) => Err(JsError::type_error(
                "The iterator does not provide a 'throw' method",
            )),
        }
    }
}
