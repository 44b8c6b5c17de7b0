//! Unit tests for Promise

use async_runtime::{EventLoop, Handler, Promise, PromiseState};
use core_types::{ErrorKind, FulfillCallback, JsError, RejectCallback, Thenable, Value};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn add_one() -> Option<Handler<Value>> {
    Some(Handler::new(|v: Value| Ok(Value::Smi(v.as_smi().unwrap_or(0) + 1))))
}

fn recorder(log: &Rc<RefCell<Vec<i32>>>, n: i32) -> Option<Handler<Value>> {
    let log = log.clone();
    Some(Handler::new(move |v| {
        log.borrow_mut().push(n);
        Ok(v)
    }))
}

#[test]
fn new_promise_is_pending() {
    let event_loop = EventLoop::new();
    let promise = Promise::new(event_loop.runtime());
    assert!(promise.is_pending());
    assert!(promise.result().is_none());
    assert!(promise.error().is_none());
}

#[test]
fn resolve_fulfils_synchronously_with_plain_value() {
    let event_loop = EventLoop::new();
    let promise = Promise::new(event_loop.runtime());
    promise.resolve(Value::Smi(42));
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.result(), Some(Value::Smi(42)));
}

#[test]
fn settlement_happens_once() {
    let event_loop = EventLoop::new();
    let promise = Promise::new(event_loop.runtime());
    promise.resolve(Value::Smi(42));
    promise.resolve(Value::Smi(100));
    promise.reject(JsError::error("late"));
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.result(), Some(Value::Smi(42)));

    let rejected = Promise::new(event_loop.runtime());
    rejected.reject(JsError::type_error("first"));
    rejected.resolve(Value::Smi(1));
    rejected.reject(JsError::error("second"));
    assert_eq!(rejected.state(), PromiseState::Rejected);
    assert_eq!(rejected.error().unwrap().message, "first");
}

#[test]
fn self_resolution_rejects_with_type_error() {
    let event_loop = EventLoop::new();
    let promise = Promise::new(event_loop.runtime());
    promise.resolve(promise.to_value());
    let error = promise.error().unwrap();
    assert_eq!(promise.state(), PromiseState::Rejected);
    assert_eq!(error.kind, ErrorKind::TypeError);
}

#[test]
fn then_runs_after_one_drain() {
    let event_loop = EventLoop::new();
    let f = Promise::new(event_loop.runtime());
    let next = f.then(add_one(), None);

    f.resolve(Value::Smi(41));
    assert!(next.is_pending());

    event_loop.run_all_microtasks();
    assert_eq!(next.state(), PromiseState::Fulfilled);
    assert_eq!(next.result(), Some(Value::Smi(42)));
}

#[test]
fn reactions_run_in_attachment_order() {
    let event_loop = EventLoop::new();
    let promise = Promise::new(event_loop.runtime());
    let log = Rc::new(RefCell::new(Vec::new()));
    for n in 1..=5 {
        promise.then(recorder(&log, n), None);
    }
    assert!(promise.has_pending_reactions());

    promise.resolve(Value::Undefined);
    assert!(log.borrow().is_empty());

    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec![1, 2, 3, 4, 5]);
    assert!(!promise.has_pending_reactions());
}

#[test]
fn then_on_settled_promise_runs_in_next_drain() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolved(event_loop.runtime(), Value::Smi(1));
    let next = promise.then(add_one(), None);
    assert!(next.is_pending());
    event_loop.run_until_done().unwrap();
    assert_eq!(next.result(), Some(Value::Smi(2)));
}

#[test]
fn handler_failure_rejects_downstream() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolved(event_loop.runtime(), Value::Smi(1));
    let next = promise.then(
        Some(Handler::new(|_| Err(JsError::type_error("handler failed")))),
        None,
    );
    event_loop.run_until_done().unwrap();
    assert_eq!(next.state(), PromiseState::Rejected);
    assert_eq!(next.error().unwrap().message, "handler failed");
    assert!(event_loop.take_uncaught_errors().is_empty());
}

#[test]
fn missing_handlers_pass_outcome_through() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();

    let fulfilled = Promise::resolved(runtime, Value::Smi(7)).then(None, None);
    let rejected = Promise::rejected(runtime, JsError::error("reason"))
        .then(add_one(), None)
        .catch_error(|e| Ok(Value::String(e.message)));

    event_loop.run_until_done().unwrap();
    assert_eq!(fulfilled.result(), Some(Value::Smi(7)));
    assert_eq!(rejected.result(), Some(Value::from("reason")));
}

#[test]
fn handler_returning_promise_is_adopted() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime().clone();
    let inner = Promise::new(&runtime);
    let returned = inner.clone();

    let next = Promise::resolved(&runtime, Value::Undefined)
        .then(Some(Handler::new(move |_| Ok(returned.to_value()))), None);
    event_loop.run_until_done().unwrap();
    assert!(next.is_pending());

    inner.resolve(Value::from("later"));
    event_loop.run_until_done().unwrap();
    assert_eq!(next.result(), Some(Value::from("later")));
}

#[test]
fn handler_returning_its_own_downstream_is_a_cycle() {
    let event_loop = EventLoop::new();
    let own: Rc<RefCell<Option<Promise>>> = Rc::new(RefCell::new(None));
    let slot = own.clone();

    let next = Promise::resolved(event_loop.runtime(), Value::Undefined).then(
        Some(Handler::new(move |_| {
            let promise = slot.borrow().clone();
            Ok(promise.map(|p| p.to_value()).unwrap_or(Value::Undefined))
        })),
        None,
    );
    *own.borrow_mut() = Some(next.clone());

    event_loop.run_until_done().unwrap();
    let error = next.error().unwrap();
    assert_eq!(error.kind, ErrorKind::TypeError);
    assert!(error.message.contains("Chaining cycle"));
}

#[test]
fn adopting_fulfilled_promise_defers_settlement() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let source = Promise::resolved(runtime, Value::Smi(5));
    let target = Promise::new(runtime);

    target.resolve(source.to_value());
    assert!(target.is_pending());
    // Locked in: later resolutions are ignored.
    target.resolve(Value::Smi(6));

    event_loop.run_all_microtasks();
    assert_eq!(target.result(), Some(Value::Smi(5)));
}

#[test]
fn adopting_rejected_promise_rejects() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let source = Promise::rejected(runtime, JsError::error("nope"));
    let target = Promise::new(runtime);
    target.resolve(source.to_value());
    event_loop.run_all_microtasks();
    assert_eq!(target.error().unwrap().message, "nope");
}

#[test]
fn drain_runs_chained_reactions_in_same_pass() {
    let event_loop = EventLoop::new();
    let promise = Promise::new(event_loop.runtime());
    let last = promise.then(add_one(), None).then(add_one(), None).then(add_one(), None);

    promise.resolve(Value::Smi(0));
    event_loop.perform_checkpoint().unwrap();
    assert_eq!(last.result(), Some(Value::Smi(3)));
    assert!(event_loop.is_microtask_queue_empty());
    assert!(event_loop.is_task_queue_empty());
}

/// A foreign awaitable that calls back synchronously.
struct Immediate(Result<Value, JsError>);

impl Thenable for Immediate {
    fn then(&self, on_fulfilled: FulfillCallback, on_rejected: RejectCallback) -> Result<(), JsError> {
        match &self.0 {
            Ok(value) => on_fulfilled(value.clone()),
            Err(error) => on_rejected(error.clone()),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Calls both callbacks, then fails.
struct Unruly;

impl Thenable for Unruly {
    fn then(&self, on_fulfilled: FulfillCallback, on_rejected: RejectCallback) -> Result<(), JsError> {
        on_fulfilled(Value::from("first"));
        on_rejected(JsError::error("second"));
        Err(JsError::error("third"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Fails before calling anything.
struct Broken;

impl Thenable for Broken {
    fn then(&self, _: FulfillCallback, _: RejectCallback) -> Result<(), JsError> {
        Err(JsError::type_error("then failed"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn foreign_thenable_is_adopted() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();

    let ok = Promise::resolved(runtime, Value::Awaitable(Rc::new(Immediate(Ok(Value::Smi(3))))));
    let err = Promise::resolved(
        runtime,
        Value::Awaitable(Rc::new(Immediate(Err(JsError::error("foreign"))))),
    );
    assert!(ok.is_pending());

    event_loop.run_until_done().unwrap();
    assert_eq!(ok.result(), Some(Value::Smi(3)));
    assert_eq!(err.error().unwrap().message, "foreign");
}

#[test]
fn thenable_calling_back_twice_settles_once() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolved(event_loop.runtime(), Value::Awaitable(Rc::new(Unruly)));
    event_loop.run_until_done().unwrap();
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.result(), Some(Value::from("first")));
}

#[test]
fn failing_then_rejects() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolved(event_loop.runtime(), Value::Awaitable(Rc::new(Broken)));
    event_loop.run_until_done().unwrap();
    assert_eq!(promise.error().unwrap().message, "then failed");
}

#[test]
fn resolved_returns_same_promise() {
    let event_loop = EventLoop::new();
    let promise = Promise::new(event_loop.runtime());
    let same = Promise::resolved(event_loop.runtime(), promise.to_value());
    assert!(same.ptr_eq(&promise));
    assert_eq!(same.id(), promise.id());
}

#[test]
fn executor_resolves_and_rejects() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();

    let resolved = Promise::from_executor(runtime, |resolve, _| {
        resolve(Value::Smi(1));
        Ok(())
    });
    assert_eq!(resolved.result(), Some(Value::Smi(1)));

    let failed = Promise::from_executor(runtime, |_, _| Err(JsError::error("executor failed")));
    assert_eq!(failed.error().unwrap().message, "executor failed");

    let resolved_then_failed = Promise::from_executor(runtime, |resolve, _| {
        resolve(Value::Smi(2));
        Err(JsError::error("ignored"))
    });
    assert_eq!(resolved_then_failed.result(), Some(Value::Smi(2)));
}

#[test]
fn finally_runs_once_and_passes_outcome_through() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let calls = Rc::new(Cell::new(0));

    let c = calls.clone();
    let fulfilled = Promise::resolved(runtime, Value::Smi(1)).finally(move || {
        c.set(c.get() + 1);
        Ok(())
    });
    let c = calls.clone();
    let rejected = Promise::rejected(runtime, JsError::error("kept")).finally(move || {
        c.set(c.get() + 1);
        Ok(())
    });
    let replaced = Promise::resolved(runtime, Value::Smi(1))
        .finally(|| Err(JsError::error("cleanup failed")));
    rejected.catch_error(|_| Ok(Value::Undefined));

    event_loop.run_until_done().unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(fulfilled.result(), Some(Value::Smi(1)));
    assert_eq!(rejected.error().unwrap().message, "kept");
    assert_eq!(replaced.error().unwrap().message, "cleanup failed");
}
