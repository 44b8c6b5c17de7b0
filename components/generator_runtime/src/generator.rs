//! Generator objects.
//!
//! A [`Generator`] couples a compiled body with its [`Context`] and enforces
//! the lifecycle:
//!
//! ```text
//! SuspendedStart --next--> Executing --yield--> SuspendedYield
//!                                    --end----> Completed
//! SuspendedYield --next/throw/return--> Executing --> ...
//! ```
//!
//! Resuming an executing generator is an error; a completed generator
//! answers `next`/`return` with a done result and re-raises `throw`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use core_types::{IteratorResult, JsError, Value};

use crate::context::{Context, Step, TryEntry, END};
use crate::iterator::{Resumable, Resume, ResumeKind};

/// A compiled generator body.
///
/// Called once per entry with the context positioned at `ctx.next`.
pub type StepFn = Box<dyn FnMut(&mut Context) -> Result<Step, JsError>>;

/// Generator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Generator created but never executed (initial state)
    SuspendedStart,
    /// Generator paused at a yield expression
    SuspendedYield,
    /// Generator is currently executing code
    Executing,
    /// Generator has finished execution
    Completed,
}

struct Body {
    step: StepFn,
    context: Context,
}

impl Body {
    /// The dispatch loop: forwards to the delegate, applies the resume
    /// operation, enters the body, and repeats until the body yields or
    /// completes.
    fn run(&mut self, resume: Resume) -> Result<IteratorResult, JsError> {
        let ctx = &mut self.context;
        ctx.resume = resume;

        loop {
            if ctx.has_delegate() {
                if let Some(result) = ctx.invoke_delegate() {
                    return Ok(result);
                }
                continue;
            }

            match ctx.resume.clone() {
                Resume::Next(value) => ctx.sent = value,
                Resume::Throw(error) => ctx.dispatch_exception(error)?,
                Resume::Return(value) => {
                    ctx.abrupt(crate::context::Completion::Return(value))?;
                }
            }

            let step = if ctx.next == END {
                ctx.stop()
            } else {
                ctx.prev = ctx.next;
                (self.step)(ctx)
            };

            match step {
                Ok(Step::Continue) => continue,
                Ok(Step::Yield(value)) => return Ok(IteratorResult::value(value)),
                Ok(Step::Complete(value)) => {
                    ctx.done = true;
                    return Ok(IteratorResult::done_with_value(value));
                }
                Err(error) => ctx.resume = Resume::Throw(error),
            }
        }
    }
}

struct GeneratorInner {
    state: Cell<GeneratorState>,
    body: RefCell<Body>,
}

/// A suspendable computation.
///
/// Cloning a `Generator` clones the handle, not the computation.
///
/// # Examples
///
/// ```
/// use core_types::Value;
/// use generator_runtime::{Generator, Step, END};
///
/// // function* () { yield 1; return 2; }
/// let gen = Generator::new(
///     |ctx| match ctx.next {
///         0 => {
///             ctx.next = 1;
///             Ok(Step::Yield(Value::Smi(1)))
///         }
///         _ => {
///             ctx.rval = Value::Smi(2);
///             ctx.next = END;
///             Ok(Step::Continue)
///         }
///     },
///     vec![],
/// );
///
/// let first = gen.next(Value::Undefined).unwrap();
/// assert_eq!((first.value, first.done), (Value::Smi(1), false));
/// let second = gen.next(Value::Undefined).unwrap();
/// assert_eq!((second.value, second.done), (Value::Smi(2), true));
/// ```
#[derive(Clone)]
pub struct Generator {
    inner: Rc<GeneratorInner>,
}

impl Generator {
    /// Creates a generator in the `SuspendedStart` state.
    pub fn new<F>(step: F, try_entries: Vec<TryEntry>) -> Self
    where
        F: FnMut(&mut Context) -> Result<Step, JsError> + 'static,
    {
        Self {
            inner: Rc::new(GeneratorInner {
                state: Cell::new(GeneratorState::SuspendedStart),
                body: RefCell::new(Body {
                    step: Box::new(step),
                    context: Context::new(try_entries),
                }),
            }),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> GeneratorState {
        self.inner.state.get()
    }

    /// Generator.prototype.next(value?)
    pub fn next(&self, value: Value) -> Result<IteratorResult, JsError> {
        self.resume(Resume::Next(value))
    }

    /// Generator.prototype.throw(exception)
    pub fn throw(&self, exception: JsError) -> Result<IteratorResult, JsError> {
        self.resume(Resume::Throw(exception))
    }

    /// Generator.prototype.return(value?)
    pub fn return_value(&self, value: Value) -> Result<IteratorResult, JsError> {
        self.resume(Resume::Return(value))
    }

    /// Performs one resume operation.
    ///
    /// # Errors
    ///
    /// - `TypeError` if the generator is already running
    /// - the injected exception for `throw` on a generator that has not
    ///   started or has completed
    /// - any exception the body does not catch (the generator completes)
    pub fn resume(&self, resume: Resume) -> Result<IteratorResult, JsError> {
        match (self.state(), resume) {
            (GeneratorState::Executing, _) => {
                Err(JsError::type_error("Generator is already running"))
            }
            (GeneratorState::Completed, Resume::Throw(error)) => Err(error),
            (GeneratorState::Completed, Resume::Next(_)) => Ok(IteratorResult::done()),
            (GeneratorState::Completed, Resume::Return(value)) => {
                Ok(IteratorResult::done_with_value(value))
            }
            (GeneratorState::SuspendedStart, Resume::Throw(error)) => {
                // Nothing has run, so no try statement can catch it.
                self.inner.state.set(GeneratorState::Completed);
                Err(error)
            }
            (GeneratorState::SuspendedStart, Resume::Return(value)) => {
                self.inner.state.set(GeneratorState::Completed);
                Ok(IteratorResult::done_with_value(value))
            }
            (_, resume) => {
                self.inner.state.set(GeneratorState::Executing);
                let outcome = self.inner.body.borrow_mut().run(resume);
                let next_state = match &outcome {
                    Ok(result) if !result.done => GeneratorState::SuspendedYield,
                    _ => GeneratorState::Completed,
                };
                self.inner.state.set(next_state);
                outcome
            }
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Resumable for Generator {
    fn supports(&self, _kind: ResumeKind) -> bool {
        true
    }

    fn resume(&self, resume: Resume) -> Result<IteratorResult, JsError> {
        Generator::resume(self, resume)
    }
}
