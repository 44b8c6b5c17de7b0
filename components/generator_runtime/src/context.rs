//! Execution context of a generator body.
//!
//! A compiled body is a state machine over integer locations. Every time the
//! body is entered the runtime sets `prev = next`; the body matches on
//! `next`, runs until it pauses, and reports what happened through a
//! [`Step`]. The context carries everything that must survive a suspension:
//! the instruction pointers, the value sent in by the last `next`, the
//! try-entry table with each region's pending completion, and the delegate
//! currently being driven.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use core_types::{IteratorResult, JsError, Value};

use crate::iterator::{Resumable, Resume, ResumeKind};

/// A location in a compiled body.
pub type Loc = usize;

/// The location of the implicit end of every body.
///
/// Bodies never need to handle it: entering `END` stops the generator.
pub const END: Loc = Loc::MAX;

/// Result of one entry into a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The body paused at a yield with this value
    Yield(Value),
    /// The body finished with this value
    Complete(Value),
    /// The context changed where execution continues; dispatch again
    Continue,
}

/// How a region of code was left.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Completion {
    /// Fell through normally
    #[default]
    Normal,
    /// An exception is propagating
    Throw(JsError),
    /// `break` to a location
    Break(Loc),
    /// `continue` to a location
    Continue(Loc),
    /// `return` with a value
    Return(Value),
}

/// A lexical try statement.
///
/// Locations satisfy `try_loc < catch_loc < finally_loc <= after_loc` for
/// the parts that exist. Entries in a table are ordered by `try_loc`, so an
/// enclosed statement always comes after the statement enclosing it.
#[derive(Debug, Clone, PartialEq)]
pub struct TryEntry {
    /// Start of the protected block
    pub try_loc: Loc,
    /// Start of the catch clause
    pub catch_loc: Option<Loc>,
    /// Start of the finally clause
    pub finally_loc: Option<Loc>,
    /// Where execution continues after a normally completed finally clause
    pub after_loc: Option<Loc>,
    /// Completion waiting for the finally clause to finish
    pub completion: Completion,
}

impl TryEntry {
    /// Creates an entry from raw locations.
    pub fn new(
        try_loc: Loc,
        catch_loc: Option<Loc>,
        finally_loc: Option<Loc>,
        after_loc: Option<Loc>,
    ) -> Self {
        Self {
            try_loc,
            catch_loc,
            finally_loc,
            after_loc,
            completion: Completion::Normal,
        }
    }

    /// `try { .. } catch { .. }`
    pub fn try_catch(try_loc: Loc, catch_loc: Loc) -> Self {
        Self::new(try_loc, Some(catch_loc), None, None)
    }

    /// `try { .. } finally { .. }`
    pub fn try_finally(try_loc: Loc, finally_loc: Loc, after_loc: Loc) -> Self {
        Self::new(try_loc, None, Some(finally_loc), Some(after_loc))
    }

    /// `try { .. } catch { .. } finally { .. }`
    pub fn try_catch_finally(try_loc: Loc, catch_loc: Loc, finally_loc: Loc, after_loc: Loc) -> Self {
        Self::new(try_loc, Some(catch_loc), Some(finally_loc), Some(after_loc))
    }

    fn take_completion(&mut self) -> Completion {
        std::mem::take(&mut self.completion)
    }
}

/// An inner iterator driven on behalf of the body (`yield*`).
#[derive(Clone)]
pub struct Delegate {
    /// The iterator resume operations are forwarded to
    pub iterator: Rc<dyn Resumable>,
    /// Slot receiving the iterator's final value
    pub result_slot: String,
    /// Where the body continues once the iterator is done
    pub next_loc: Loc,
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("result_slot", &self.result_slot)
            .field("next_loc", &self.next_loc)
            .finish_non_exhaustive()
    }
}

/// State shared between the runtime and a compiled body.
#[derive(Debug)]
pub struct Context {
    /// Location the body was last entered at
    pub prev: Loc,
    /// Location the body continues at
    pub next: Loc,
    /// Value passed by the last `next` operation
    pub sent: Value,
    /// Value to return once the body stops
    pub rval: Value,
    /// Whether the body has stopped
    pub done: bool,
    pub(crate) resume: Resume,
    try_entries: Vec<TryEntry>,
    delegate: Option<Delegate>,
    slots: HashMap<String, Value>,
}

impl Context {
    /// Creates a context positioned at location 0.
    pub fn new(try_entries: Vec<TryEntry>) -> Self {
        Self {
            prev: 0,
            next: 0,
            sent: Value::Undefined,
            rval: Value::Undefined,
            done: false,
            resume: Resume::Next(Value::Undefined),
            try_entries,
            delegate: None,
            slots: HashMap::new(),
        }
    }

    /// Kind of the resume operation being processed.
    pub fn resume_kind(&self) -> ResumeKind {
        self.resume.kind()
    }

    /// The try-entry table.
    pub fn try_entries(&self) -> &[TryEntry] {
        &self.try_entries
    }

    /// Whether a delegate is currently active.
    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    /// Reads a named slot; unset slots read as undefined.
    pub fn slot(&self, name: &str) -> Value {
        self.slots.get(name).cloned().unwrap_or(Value::Undefined)
    }

    /// Writes a named slot.
    pub fn set_slot(&mut self, name: impl Into<String>, value: Value) {
        self.slots.insert(name.into(), value);
    }

    /// Leaves the current location with an abrupt completion.
    ///
    /// If a finally clause encloses the current location, control detours
    /// through it first with `completion` stashed on its entry; `finish`
    /// resumes the jump afterwards. A `break`/`continue` whose target lies
    /// inside the same try statement does not detour.
    pub fn abrupt(&mut self, completion: Completion) -> Result<Step, JsError> {
        let prev = self.prev;
        let mut finally_index = self.try_entries.iter().rposition(|entry| {
            entry.try_loc <= prev && entry.finally_loc.map_or(false, |loc| prev < loc)
        });

        if let (Some(index), Completion::Break(target) | Completion::Continue(target)) =
            (finally_index, &completion)
        {
            let entry = &self.try_entries[index];
            let finally_loc = entry.finally_loc.unwrap_or(entry.try_loc);
            if entry.try_loc <= *target && *target <= finally_loc {
                finally_index = None;
            }
        }

        match finally_index {
            Some(index) => {
                let entry = &mut self.try_entries[index];
                entry.completion = completion;
                self.resume = Resume::Next(Value::Undefined);
                self.next = entry.finally_loc.unwrap_or(END);
                Ok(Step::Continue)
            }
            None => self.complete(completion, None),
        }
    }

    /// Applies a completion record.
    ///
    /// `Throw` re-raises, `Break`/`Continue` jump, `Return` heads for the end
    /// of the body (through any further finally clauses), and `Normal`
    /// continues at `after_loc` when one is given.
    pub fn complete(&mut self, completion: Completion, after_loc: Option<Loc>) -> Result<Step, JsError> {
        match completion {
            Completion::Throw(error) => return Err(error),
            Completion::Break(loc) | Completion::Continue(loc) => self.next = loc,
            Completion::Return(value) => {
                self.rval = value.clone();
                self.resume = Resume::Return(value);
                self.next = END;
            }
            Completion::Normal => {
                if let Some(loc) = after_loc {
                    self.next = loc;
                }
            }
        }
        Ok(Step::Continue)
    }

    /// Ends the finally clause starting at `finally_loc`, resuming whatever
    /// completion was waiting for it.
    ///
    /// # Errors
    ///
    /// Re-raises a stashed exception; an unknown location is an
    /// `InternalError`.
    pub fn finish(&mut self, finally_loc: Loc) -> Result<Step, JsError> {
        let index = self
            .try_entries
            .iter()
            .rposition(|entry| entry.finally_loc == Some(finally_loc))
            .ok_or_else(|| {
                JsError::internal(format!("no finally clause at location {}", finally_loc))
            })?;
        let entry = &mut self.try_entries[index];
        let completion = entry.take_completion();
        let after_loc = entry.after_loc;
        self.complete(completion, after_loc)
    }

    /// Takes the exception routed to the catch clause of the try statement
    /// starting at `try_loc`.
    ///
    /// # Errors
    ///
    /// `InternalError` when no exception is pending for that statement.
    pub fn catch(&mut self, try_loc: Loc) -> Result<JsError, JsError> {
        let entry = self
            .try_entries
            .iter_mut()
            .rev()
            .find(|entry| entry.try_loc == try_loc)
            .ok_or_else(|| JsError::internal("illegal catch attempt"))?;
        match entry.take_completion() {
            Completion::Throw(error) => Ok(error),
            other => {
                entry.completion = other;
                Err(JsError::internal("illegal catch attempt"))
            }
        }
    }

    /// Starts driving `iterator` on behalf of the body (`yield*`).
    ///
    /// Once the iterator is done its final value is written to
    /// `result_slot` and the body continues at `next_loc`.
    pub fn delegate_yield(
        &mut self,
        iterator: Rc<dyn Resumable>,
        result_slot: impl Into<String>,
        next_loc: Loc,
    ) -> Result<Step, JsError> {
        self.delegate = Some(Delegate {
            iterator,
            result_slot: result_slot.into(),
            next_loc,
        });
        if self.resume_kind() == ResumeKind::Next {
            // The value that resumed the outer body is not meant for the
            // delegate's first next.
            self.resume = Resume::Next(Value::Undefined);
        }
        Ok(Step::Continue)
    }

    /// Stops the body, completing with `rval`.
    pub fn stop(&mut self) -> Result<Step, JsError> {
        self.done = true;
        Ok(Step::Complete(self.rval.clone()))
    }

    /// Routes an exception raised at `prev` to the innermost enclosing
    /// catch or finally clause.
    ///
    /// # Errors
    ///
    /// Returns the exception when nothing encloses `prev` (the body is then
    /// done), or an `InternalError` for an entry with neither clause.
    pub(crate) fn dispatch_exception(&mut self, exception: JsError) -> Result<(), JsError> {
        if self.done {
            return Err(exception);
        }

        let prev = self.prev;
        for index in (0..self.try_entries.len()).rev() {
            let entry = &self.try_entries[index];
            if entry.try_loc > prev {
                continue;
            }
            let target = match (entry.catch_loc, entry.finally_loc) {
                (None, None) => {
                    return Err(JsError::internal("try statement without catch or finally"))
                }
                (Some(catch_loc), _) if prev < catch_loc => Some(catch_loc),
                (_, Some(finally_loc)) if prev < finally_loc => Some(finally_loc),
                _ => None,
            };
            if let Some(loc) = target {
                log::trace!("exception at {} routed to {}", prev, loc);
                self.try_entries[index].completion = Completion::Throw(exception);
                self.next = loc;
                self.resume = Resume::Next(Value::Undefined);
                return Ok(());
            }
        }

        self.done = true;
        self.next = END;
        Err(exception)
    }

    /// Forwards the pending resume operation to the active delegate.
    ///
    /// Returns the delegate's result when it yielded; `None` when dispatch
    /// should continue in the outer body (the delegate finished, failed, or
    /// lacked the requested operation).
    pub(crate) fn invoke_delegate(&mut self) -> Option<IteratorResult> {
        let delegate = self.delegate.clone()?;
        let kind = self.resume_kind();

        if !delegate.iterator.supports(kind) {
            self.delegate = None;
            if kind == ResumeKind::Throw && delegate.iterator.supports(ResumeKind::Return) {
                // Give the delegate a chance to clean up before the
                // missing-method failure is raised in the outer body.
                self.resume = Resume::Return(Value::Undefined);
                self.delegate = Some(delegate.clone());
                let _ = self.invoke_delegate();
                self.delegate = None;
                if self.resume_kind() == ResumeKind::Throw {
                    return None;
                }
            }
            if kind != ResumeKind::Return {
                self.resume = Resume::Throw(JsError::type_error(format!(
                    "The iterator does not provide a '{}' method",
                    kind
                )));
            }
            return None;
        }

        match delegate.iterator.resume(self.resume.clone()) {
            Err(error) => {
                self.resume = Resume::Throw(error);
                self.delegate = None;
                None
            }
            Ok(info) if info.done => {
                self.slots.insert(delegate.result_slot, info.value);
                self.next = delegate.next_loc;
                if kind != ResumeKind::Return {
                    self.resume = Resume::Next(Value::Undefined);
                }
                self.delegate = None;
                None
            }
            Ok(info) => Some(info),
        }
    }
}
