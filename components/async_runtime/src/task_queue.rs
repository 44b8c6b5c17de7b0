//! Task and microtask queue management.
//!
//! Tasks are the host's coarse unit of work (timers, I/O completions, and
//! microtask flushes when the host has no checkpoint primitive). Microtasks
//! are promise reactions and other runtime continuations that must all run
//! before the host moves on.

use std::collections::VecDeque;
use std::fmt;

use core_types::JsError;

type Callback = Box<dyn FnOnce() -> Result<(), JsError>>;

/// Work scheduled with the host for a later turn.
pub struct Task {
    callback: Callback,
}

impl Task {
    /// Wraps a closure to run as a host task.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Consumes the task and runs it.
    pub fn run(self) -> Result<(), JsError> {
        (self.callback)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// Work that runs in the current microtask drain.
///
/// Promise reactions, adoption jobs and driver continuations are all
/// microtasks.
pub struct MicroTask {
    callback: Callback,
}

impl MicroTask {
    /// Wraps a closure to run in the next drain.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Consumes the microtask and runs it.
    pub fn run(self) -> Result<(), JsError> {
        (self.callback)()
    }
}

impl fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicroTask").finish_non_exhaustive()
    }
}

/// FIFO queue of jobs.
pub struct JobQueue<T> {
    jobs: VecDeque<T>,
}

/// Queue of host tasks.
pub type TaskQueue = JobQueue<Task>;

/// Queue of microtasks, drained to empty by [`Runtime`](crate::Runtime).
pub type MicrotaskQueue = JobQueue<MicroTask>;

impl<T> JobQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    /// Appends a job.
    pub fn enqueue(&mut self, job: T) {
        self.jobs.push_back(job);
    }

    /// Removes the oldest job.
    pub fn dequeue(&mut self) -> Option<T> {
        self.jobs.pop_front()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JobQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue").field("len", &self.jobs.len()).finish()
    }
}
