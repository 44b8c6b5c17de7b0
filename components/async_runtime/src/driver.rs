//! Async driver: runs a generator body as an async function or async
//! generator.
//!
//! The body yields [`Value::Await`] markers where the source awaited. The
//! driver resolves the awaited value, then resumes the generator with its
//! fulfilment (`next`) or rejection (`throw`). Any other yielded value is
//! resolved and reported to the consumer as `{value, done: false}`.
//!
//! Operations issued on one [`AsyncIterator`] apply to the generator
//! strictly in issue order: each waits for the previous one to settle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use core_types::{IteratorResult, JsError, Value};
use generator_runtime::{Generator, Resume};

use crate::promise::{Handler, Promise};
use crate::runtime::Runtime;

struct AsyncIteratorInner {
    runtime: Runtime,
    generator: Generator,
    previous: RefCell<Option<Promise>>,
}

/// Promise-returning iterator over a generator body.
///
/// Each operation returns a promise of a [`Value::IterResult`].
///
/// # Examples
///
/// ```
/// use async_runtime::{AsyncIterator, EventLoop, Promise};
/// use core_types::{IteratorResult, Value};
/// use generator_runtime::{Generator, Step};
///
/// let event_loop = EventLoop::new();
/// let runtime = event_loop.runtime().clone();
/// let awaited = Promise::resolved(&runtime, Value::Smi(20));
///
/// // async function* () { const x = await awaited; yield x + 1; }
/// let gen = Generator::new(
///     move |ctx| match ctx.next {
///         0 => {
///             ctx.next = 1;
///             Ok(Step::Yield(Value::awrap(awaited.to_value())))
///         }
///         1 => {
///             ctx.next = 2;
///             let x = ctx.sent.as_smi().unwrap_or(0);
///             Ok(Step::Yield(Value::Smi(x + 1)))
///         }
///         _ => ctx.stop(),
///     },
///     vec![],
/// );
///
/// let iter = AsyncIterator::new(&runtime, gen);
/// let first = iter.next(Value::Undefined);
/// event_loop.run_until_done().unwrap();
///
/// let result = IteratorResult::from_value(&first.result().unwrap()).unwrap();
/// assert_eq!((result.value, result.done), (Value::Smi(21), false));
/// ```
#[derive(Clone)]
pub struct AsyncIterator {
    inner: Rc<AsyncIteratorInner>,
}

impl AsyncIterator {
    /// Wraps `generator`.
    pub fn new(runtime: &Runtime, generator: Generator) -> Self {
        Self {
            inner: Rc::new(AsyncIteratorInner {
                runtime: runtime.clone(),
                generator,
                previous: RefCell::new(None),
            }),
        }
    }

    /// The wrapped generator.
    pub fn generator(&self) -> &Generator {
        &self.inner.generator
    }

    /// Queues `next(value)`.
    pub fn next(&self, value: Value) -> Promise {
        self.enqueue(Resume::Next(value))
    }

    /// Queues `throw(error)`.
    pub fn throw(&self, error: JsError) -> Promise {
        self.enqueue(Resume::Throw(error))
    }

    /// Queues `return(value)`.
    pub fn return_value(&self, value: Value) -> Promise {
        self.enqueue(Resume::Return(value))
    }

    /// Runs `resume` once the previously issued operation has settled.
    fn enqueue(&self, resume: Resume) -> Promise {
        let output = Promise::new(&self.inner.runtime);
        let previous = self.inner.previous.replace(Some(output.clone()));

        match previous {
            None => self.invoke(resume, output.clone()),
            Some(previous) => {
                let (after_fulfilled, after_rejected) = (self.clone(), self.clone());
                let (fulfilled_resume, rejected_resume) = (resume.clone(), resume);
                let (fulfilled_output, rejected_output) = (output.clone(), output.clone());
                previous.subscribe(
                    move |_| after_fulfilled.invoke(fulfilled_resume, fulfilled_output),
                    move |_| after_rejected.invoke(rejected_resume, rejected_output),
                );
            }
        }

        output
    }

    /// Resumes the generator and settles `output` once the operation
    /// produced a value that is not an await marker.
    fn invoke(&self, resume: Resume, output: Promise) {
        let result = match self.inner.generator.resume(resume) {
            Ok(result) => result,
            Err(error) => {
                output.reject(error);
                return;
            }
        };

        let IteratorResult { value, done } = result;
        let runtime = &self.inner.runtime;
        match value {
            Value::Await(awaited) => {
                let (on_fulfilled, on_rejected) = (self.clone(), self.clone());
                let fulfilled_output = output.clone();
                Promise::resolved(runtime, *awaited).subscribe(
                    move |value| on_fulfilled.invoke(Resume::Next(value), fulfilled_output),
                    move |error| on_rejected.invoke(Resume::Throw(error), output),
                );
            }
            value => {
                let on_rejected = self.clone();
                let fulfilled_output = output.clone();
                Promise::resolved(runtime, value).subscribe(
                    move |value| {
                        fulfilled_output.resolve(IteratorResult { value, done }.to_value())
                    },
                    move |error| on_rejected.invoke(Resume::Throw(error), output),
                );
            }
        }
    }
}

impl fmt::Debug for AsyncIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncIterator")
            .field("generator", &self.inner.generator)
            .finish_non_exhaustive()
    }
}

/// What kind of function a generator body was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncKind {
    /// `async function`: every yield is an await
    Function,
    /// `async function*`
    Generator,
}

/// The consumer-facing result of calling an async body.
#[derive(Debug)]
pub enum AsyncCall {
    /// An async generator's iterator
    Iterator(AsyncIterator),
    /// An async function's completion
    Completion(Promise),
}

impl AsyncCall {
    /// The completion promise, if this was an async function.
    pub fn into_completion(self) -> Option<Promise> {
        match self {
            AsyncCall::Completion(promise) => Some(promise),
            AsyncCall::Iterator(_) => None,
        }
    }

    /// The iterator, if this was an async generator.
    pub fn into_iterator(self) -> Option<AsyncIterator> {
        match self {
            AsyncCall::Iterator(iter) => Some(iter),
            AsyncCall::Completion(_) => None,
        }
    }
}

/// Starts an async body.
///
/// An async generator is returned as its iterator without running. An
/// async function runs to its first await immediately; its completion
/// fulfils with the return value, or with the next result if the body
/// yielded a plain value.
pub fn async_call(runtime: &Runtime, generator: Generator, kind: AsyncKind) -> AsyncCall {
    let iter = AsyncIterator::new(runtime, generator);
    match kind {
        AsyncKind::Generator => AsyncCall::Iterator(iter),
        AsyncKind::Function => AsyncCall::Completion(completion(iter)),
    }
}

/// Runs an async function body and returns its completion.
///
/// # Examples
///
/// ```
/// use async_runtime::{run_async, EventLoop};
/// use core_types::Value;
/// use generator_runtime::Generator;
///
/// let event_loop = EventLoop::new();
/// let completion = run_async(
///     event_loop.runtime(),
///     Generator::new(
///         |ctx| {
///             ctx.rval = Value::from("done");
///             ctx.stop()
///         },
///         vec![],
///     ),
/// );
/// event_loop.run_until_done().unwrap();
/// assert_eq!(completion.result(), Some(Value::from("done")));
/// ```
pub fn run_async(runtime: &Runtime, generator: Generator) -> Promise {
    completion(AsyncIterator::new(runtime, generator))
}

fn completion(iter: AsyncIterator) -> Promise {
    iter.next(Value::Undefined).then(
        Some(Handler::new(move |result| {
            let result = IteratorResult::from_value(&result)?;
            if result.done {
                Ok(result.value)
            } else {
                Ok(iter.next(Value::Undefined).to_value())
            }
        })),
        None,
    )
}
