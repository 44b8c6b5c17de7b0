//! Promise implementation.
//!
//! A [`Promise`] settles exactly once. Reactions registered with
//! [`Promise::then`] run from a single microtask per settlement batch, in
//! registration order, and propagate their outcome to a downstream promise.
//! Resolving with an awaitable adopts its eventual state one microtask
//! later, never synchronously.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use core_types::{FulfillCallback, JsError, RejectCallback, Thenable, Value};

use crate::rejection;
use crate::runtime::Runtime;
use crate::task_queue::MicroTask;

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been resolved with a value.
    Fulfilled,
    /// The promise has been rejected with an error.
    Rejected,
}

/// Whether a rejection has been observed by a failure handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectionTracking {
    /// No failure handler seen yet
    #[default]
    Unset,
    /// A failure handler was attached
    Handled,
    /// Reported to the host as unhandled
    Unhandled,
}

/// A one-shot promise handler.
///
/// Returning `Ok` resolves the downstream promise with the value (adopting
/// it if awaitable); returning `Err` rejects it.
pub struct Handler<T> {
    callback: Box<dyn FnOnce(T) -> Result<Value, JsError>>,
}

impl<T> Handler<T> {
    /// Creates a new Handler from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(T) -> Result<Value, JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Calls the handler.
    pub fn call(self, arg: T) -> Result<Value, JsError> {
        (self.callback)(arg)
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler {{ ... }}")
    }
}

/// Success handler.
pub type OnFulfilled = Handler<Value>;
/// Failure handler.
pub type OnRejected = Handler<JsError>;

/// A reaction to be triggered when a Promise settles.
#[derive(Debug)]
pub struct PromiseReaction {
    /// Settled from the handler's outcome; `None` for runtime-internal
    /// subscriptions
    pub downstream: Option<Promise>,
    /// Handler for fulfilled state; absent passes the value through
    pub on_fulfilled: Option<OnFulfilled>,
    /// Handler for rejected state; absent passes the reason through
    pub on_rejected: Option<OnRejected>,
}

struct PromiseInner {
    id: u64,
    state: PromiseState,
    result: Option<Value>,
    error: Option<JsError>,
    reactions: VecDeque<PromiseReaction>,
    resolved: bool,
    notified: bool,
    rejection: RejectionTracking,
    check_scheduled: bool,
    parent: Option<Promise>,
}

/// A promise bound to a [`Runtime`].
///
/// Cloning a `Promise` clones the handle.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Handler, Promise, PromiseState};
/// use core_types::Value;
///
/// let event_loop = EventLoop::new();
/// let promise = Promise::new(event_loop.runtime());
/// let next = promise.then(
///     Some(Handler::new(|v: Value| Ok(Value::Smi(v.as_smi().unwrap_or(0) + 1)))),
///     None,
/// );
///
/// promise.resolve(Value::Smi(41));
/// event_loop.run_until_done().unwrap();
/// assert_eq!(next.state(), PromiseState::Fulfilled);
/// assert_eq!(next.result(), Some(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<PromiseInner>>,
    runtime: Runtime,
}

impl Promise {
    /// Creates a new pending Promise.
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseInner {
                id: runtime.next_promise_id(),
                state: PromiseState::Pending,
                result: None,
                error: None,
                reactions: VecDeque::new(),
                resolved: false,
                notified: false,
                rejection: RejectionTracking::Unset,
                check_scheduled: false,
                parent: None,
            })),
            runtime: runtime.clone(),
        }
    }

    /// Returns `value` itself if it is one of this runtime's promises,
    /// otherwise a new promise resolved with it.
    pub fn resolved(runtime: &Runtime, value: Value) -> Self {
        if let Some(promise) = Promise::from_value(&value) {
            if promise.runtime.ptr_eq(runtime) {
                return promise;
            }
        }
        let promise = Promise::new(runtime);
        promise.resolve(value);
        promise
    }

    /// Creates a promise already rejected with `error`.
    pub fn rejected(runtime: &Runtime, error: JsError) -> Self {
        let promise = Promise::new(runtime);
        promise.reject(error);
        promise
    }

    /// Creates a promise and runs `executor` with its resolving functions.
    ///
    /// An executor returning `Err` rejects the promise unless it already
    /// resolved it.
    pub fn from_executor<F>(runtime: &Runtime, executor: F) -> Self
    where
        F: FnOnce(FulfillCallback, RejectCallback) -> Result<(), JsError>,
    {
        let promise = Promise::new(runtime);
        let done = Rc::new(Cell::new(false));
        let (resolve, reject) = promise.resolving_functions(done.clone());
        if let Err(error) = executor(resolve, reject) {
            if !done.replace(true) {
                promise.settle_rejected(error);
            }
        }
        promise
    }

    /// Returns the promise carried by `value`, if it is one.
    pub fn from_value(value: &Value) -> Option<Promise> {
        value
            .as_thenable()
            .and_then(|thenable| thenable.as_any().downcast_ref::<Promise>())
            .cloned()
    }

    /// Wraps this promise as an awaitable value.
    pub fn to_value(&self) -> Value {
        Value::Awaitable(Rc::new(self.clone()))
    }

    /// Resolves the Promise with a value.
    ///
    /// No-op once the promise has been resolved or rejected. Resolving with
    /// the promise itself rejects it with a `TypeError`; resolving with an
    /// awaitable locks the promise in and adopts the awaitable's outcome.
    pub fn resolve(&self, value: Value) {
        if self.inner.borrow().resolved {
            return;
        }
        self.resolve_locked(value);
    }

    /// Rejects the Promise with an error.
    ///
    /// No-op once the promise has been resolved or rejected.
    pub fn reject(&self, error: JsError) {
        if self.inner.borrow().resolved {
            return;
        }
        self.settle_rejected(error);
    }

    /// Adds handlers for fulfillment and/or rejection.
    ///
    /// Returns a new Promise settled from the outcome of the handler that
    /// runs. Attaching a failure handler marks this promise's rejection as
    /// handled.
    pub fn then(&self, on_fulfilled: Option<OnFulfilled>, on_rejected: Option<OnRejected>) -> Promise {
        let downstream = Promise::new(&self.runtime);
        self.add_reaction(PromiseReaction {
            downstream: Some(downstream.clone()),
            on_fulfilled,
            on_rejected,
        });
        downstream
    }

    /// `then(None, Some(f))`.
    pub fn catch_error<F>(&self, on_rejected: F) -> Promise
    where
        F: FnOnce(JsError) -> Result<Value, JsError> + 'static,
    {
        self.then(None, Some(Handler::new(on_rejected)))
    }

    /// Runs `on_finally` on either outcome, then passes the outcome through.
    ///
    /// A failing `on_finally` rejects the returned promise with its failure.
    pub fn finally<F>(&self, on_finally: F) -> Promise
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        let callback = Rc::new(Cell::new(Some(on_finally)));
        let on_rejected_callback = callback.clone();
        self.then(
            Some(Handler::new(move |value| {
                if let Some(f) = callback.take() {
                    f()?;
                }
                Ok(value)
            })),
            Some(Handler::new(move |error| {
                if let Some(f) = on_rejected_callback.take() {
                    f()?;
                }
                Err(error)
            })),
        )
    }

    /// Registers a reaction, notifying immediately if already settled.
    pub fn add_reaction(&self, reaction: PromiseReaction) {
        let handles_rejection = reaction.on_rejected.is_some();
        let settled = {
            let mut inner = self.inner.borrow_mut();
            inner.reactions.push_back(reaction);
            inner.state != PromiseState::Pending
        };
        if handles_rejection {
            self.mark_rejection_handled();
        }
        if settled {
            self.notify();
        }
    }

    /// Subscribes runtime-internal callbacks without creating a downstream
    /// promise.
    pub(crate) fn subscribe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(Value) + 'static,
        R: FnOnce(JsError) + 'static,
    {
        self.add_reaction(PromiseReaction {
            downstream: None,
            on_fulfilled: Some(Handler::new(move |value| {
                on_fulfilled(value);
                Ok(Value::Undefined)
            })),
            on_rejected: Some(Handler::new(move |error| {
                on_rejected(error);
                Ok(Value::Undefined)
            })),
        });
    }

    /// Get the current state.
    pub fn state(&self) -> PromiseState {
        self.inner.borrow().state
    }

    /// The fulfilment value, once fulfilled.
    pub fn result(&self) -> Option<Value> {
        self.inner.borrow().result.clone()
    }

    /// The rejection reason, once rejected.
    pub fn error(&self) -> Option<JsError> {
        self.inner.borrow().error.clone()
    }

    /// Returns true while the promise has not settled.
    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// Runtime-unique identifier, used in logs and hook reports.
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    /// Checks if there are reactions not yet run.
    pub fn has_pending_reactions(&self) -> bool {
        !self.inner.borrow().reactions.is_empty()
    }

    /// Rejection tracking state.
    pub fn rejection_tracking(&self) -> RejectionTracking {
        self.inner.borrow().rejection
    }

    /// The runtime this promise schedules on.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Returns true if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn resolve_locked(&self, value: Value) {
        self.inner.borrow_mut().resolved = true;

        if let Some(promise) = Promise::from_value(&value) {
            if promise.ptr_eq(self) {
                self.settle_rejected(JsError::type_error("Chaining cycle detected for promise"));
                return;
            }
        }

        match value.as_thenable() {
            Some(thenable) => self.adopt(thenable.clone()),
            None => self.fulfill(value),
        }
    }

    /// Follows `thenable` from a microtask.
    fn adopt(&self, thenable: Rc<dyn Thenable>) {
        let target = self.clone();
        self.runtime.enqueue_microtask(MicroTask::new(move || {
            let done = Rc::new(Cell::new(false));
            let (on_fulfilled, on_rejected) = target.resolving_functions(done.clone());
            if let Err(error) = thenable.then(on_fulfilled, on_rejected) {
                if !done.replace(true) {
                    target.settle_rejected(error);
                }
            }
            Ok(())
        }));
    }

    /// A resolve/reject pair sharing one `done` guard, so whichever runs
    /// first wins and the other is ignored.
    fn resolving_functions(&self, done: Rc<Cell<bool>>) -> (FulfillCallback, RejectCallback) {
        let on_fulfilled_target = self.clone();
        let on_fulfilled_done = done.clone();
        let on_rejected_target = self.clone();
        (
            Box::new(move |value| {
                if !on_fulfilled_done.replace(true) {
                    on_fulfilled_target.resolve_locked(value);
                }
            }),
            Box::new(move |error| {
                if !done.replace(true) {
                    on_rejected_target.settle_rejected(error);
                }
            }),
        )
    }

    fn fulfill(&self, value: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != PromiseState::Pending {
                return;
            }
            inner.state = PromiseState::Fulfilled;
            inner.result = Some(value);
            log::trace!("promise #{} fulfilled", inner.id);
        }
        self.notify();
    }

    fn settle_rejected(&self, error: JsError) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != PromiseState::Pending {
                return;
            }
            inner.resolved = true;
            inner.state = PromiseState::Rejected;
            log::trace!("promise #{} rejected: {}", inner.id, error);
            inner.error = Some(error);
        }
        self.notify();
    }

    /// Rejection forwarded from `source` by a reaction without a failure
    /// handler. Only `source` is reported if nobody handles it.
    fn reject_passthrough(&self, error: JsError, source: &Promise) {
        let already_handled = {
            let mut inner = self.inner.borrow_mut();
            if inner.resolved {
                return;
            }
            inner.parent = Some(source.clone());
            inner.rejection == RejectionTracking::Handled
        };
        if already_handled {
            source.mark_rejection_handled();
        }
        self.settle_rejected(error);
    }

    /// Marks the rejection handled here and up the pass-through chain,
    /// sending the late-handled notice for any promise already reported.
    fn mark_rejection_handled(&self) {
        let (was_unhandled, parent) = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.rejection;
            if previous == RejectionTracking::Handled {
                return;
            }
            inner.rejection = RejectionTracking::Handled;
            (previous == RejectionTracking::Unhandled, inner.parent.clone())
        };
        if was_unhandled {
            rejection::schedule_handled_notice(self);
        }
        if let Some(parent) = parent {
            parent.mark_rejection_handled();
        }
    }

    /// Schedules one microtask to drain the reaction queue.
    fn notify(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.notified || inner.state == PromiseState::Pending {
                return;
            }
            inner.notified = true;
        }
        let promise = self.clone();
        self.runtime.enqueue_microtask(MicroTask::new(move || {
            promise.drain_reactions();
            Ok(())
        }));
    }

    fn drain_reactions(&self) {
        loop {
            let next = self.inner.borrow_mut().reactions.pop_front();
            let Some(reaction) = next else {
                break;
            };
            self.call_reaction(reaction);
        }

        let check = {
            let mut inner = self.inner.borrow_mut();
            inner.notified = false;
            let check = inner.state == PromiseState::Rejected
                && inner.rejection == RejectionTracking::Unset
                && inner.parent.is_none()
                && !inner.check_scheduled;
            if check {
                inner.check_scheduled = true;
            }
            check
        };
        if check {
            rejection::schedule_unhandled_check(self);
        }
    }

    fn call_reaction(&self, reaction: PromiseReaction) {
        let (state, result, error) = {
            let inner = self.inner.borrow();
            (inner.state, inner.result.clone(), inner.error.clone())
        };
        let PromiseReaction {
            downstream,
            on_fulfilled,
            on_rejected,
        } = reaction;

        let outcome = match (state, result, error) {
            (PromiseState::Fulfilled, Some(value), _) => match on_fulfilled {
                Some(handler) => handler.call(value),
                None => Ok(value),
            },
            (PromiseState::Rejected, _, Some(error)) => match on_rejected {
                Some(handler) => handler.call(error),
                None => {
                    if let Some(downstream) = downstream {
                        downstream.reject_passthrough(error, self);
                    }
                    return;
                }
            },
            _ => return,
        };

        match (downstream, outcome) {
            (Some(downstream), Ok(value)) => downstream.resolve(value),
            (Some(downstream), Err(error)) => downstream.reject(error),
            (None, Ok(_)) => {}
            (None, Err(error)) => self.runtime.report_error(&error),
        }
    }

    /// Reports the rejection as unhandled, once.
    pub(crate) fn take_unhandled(&self) -> Option<JsError> {
        let mut inner = self.inner.borrow_mut();
        if inner.rejection != RejectionTracking::Unset || inner.parent.is_some() {
            return None;
        }
        inner.rejection = RejectionTracking::Unhandled;
        inner.error.clone()
    }
}

impl Thenable for Promise {
    fn then(&self, on_fulfilled: FulfillCallback, on_rejected: RejectCallback) -> Result<(), JsError> {
        self.subscribe(on_fulfilled, on_rejected);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Promise")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("result", &inner.result)
            .field("error", &inner.error)
            .finish_non_exhaustive()
    }
}
