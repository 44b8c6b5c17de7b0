//! Promise combinators.
//!
//! Inputs are plain values or awaitables; plain values count as already
//! fulfilled.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use core_types::{ErrorKind, JsError, Value};

use crate::promise::Promise;
use crate::runtime::Runtime;

impl Promise {
    /// Fulfils with an array of every input's value, in input order, or
    /// rejects with the first rejection.
    pub fn all(runtime: &Runtime, values: Vec<Value>) -> Promise {
        let result = Promise::new(runtime);
        if values.is_empty() {
            result.resolve(Value::array(Vec::new()));
            return result;
        }

        let slots = Rc::new(RefCell::new(vec![Value::Undefined; values.len()]));
        let remaining = Rc::new(Cell::new(values.len()));
        for (index, value) in values.into_iter().enumerate() {
            let (slots, remaining) = (slots.clone(), remaining.clone());
            let (on_fulfilled, on_rejected) = (result.clone(), result.clone());
            Promise::resolved(runtime, value).subscribe(
                move |value| {
                    slots.borrow_mut()[index] = value;
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let values = slots.take();
                        on_fulfilled.resolve(Value::array(values));
                    }
                },
                move |error| on_rejected.reject(error),
            );
        }
        result
    }

    /// Settles like the first input to settle. Stays pending for no input.
    pub fn race(runtime: &Runtime, values: Vec<Value>) -> Promise {
        let result = Promise::new(runtime);
        for value in values {
            let (on_fulfilled, on_rejected) = (result.clone(), result.clone());
            Promise::resolved(runtime, value).subscribe(
                move |value| on_fulfilled.resolve(value),
                move |error| on_rejected.reject(error),
            );
        }
        result
    }

    /// Fulfils with the first fulfilment. Rejects with an `AggregateError`
    /// carrying every reason, in input order, when all inputs reject.
    pub fn any(runtime: &Runtime, values: Vec<Value>) -> Promise {
        let result = Promise::new(runtime);
        if values.is_empty() {
            result.reject(aggregate_error(Vec::new()));
            return result;
        }

        let reasons = Rc::new(RefCell::new(vec![Value::Undefined; values.len()]));
        let remaining = Rc::new(Cell::new(values.len()));
        for (index, value) in values.into_iter().enumerate() {
            let (reasons, remaining) = (reasons.clone(), remaining.clone());
            let (on_fulfilled, on_rejected) = (result.clone(), result.clone());
            Promise::resolved(runtime, value).subscribe(
                move |value| on_fulfilled.resolve(value),
                move |error| {
                    reasons.borrow_mut()[index] = error.to_value();
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let reasons = reasons.take();
                        on_rejected.reject(aggregate_error(reasons));
                    }
                },
            );
        }
        result
    }
}

fn aggregate_error(reasons: Vec<Value>) -> JsError {
    JsError::new(ErrorKind::AggregateError, "All promises were rejected")
        .with_value(Value::array(reasons))
}
