//! Event loop implementation.
//!
//! The bundled host for a [`Runtime`]. Each turn of the loop:
//! 1. Takes the oldest task from the task queue and executes it
//! 2. Runs every checkpoint queued meanwhile (microtask flushes)
//! 3. Repeats
//!
//! Errors the runtime reports (failing microtasks) are collected and can be
//! inspected with [`EventLoop::take_uncaught_errors`].

use std::cell::RefCell;
use std::rc::Rc;

use core_types::JsError;

use crate::config::{RuntimeConfig, Scheduling};
use crate::runtime::{HostScheduler, Runtime};
use crate::task_queue::{MicroTask, Task, TaskQueue};

#[derive(Debug, Default)]
struct LoopHost {
    tasks: RefCell<TaskQueue>,
    checkpoints: RefCell<TaskQueue>,
    uncaught: RefCell<Vec<JsError>>,
    scheduling: Scheduling,
}

impl LoopHost {
    fn next_task(&self) -> Option<Task> {
        self.tasks.borrow_mut().dequeue()
    }

    fn next_checkpoint(&self) -> Option<Task> {
        self.checkpoints.borrow_mut().dequeue()
    }
}

impl HostScheduler for LoopHost {
    fn queue_task(&self, task: Task) {
        self.tasks.borrow_mut().enqueue(task);
    }

    fn queue_checkpoint(&self, task: Task) -> Result<(), Task> {
        match self.scheduling {
            Scheduling::Microtask => {
                self.checkpoints.borrow_mut().enqueue(task);
                Ok(())
            }
            Scheduling::Macrotask => Err(task),
        }
    }

    fn report_error(&self, error: &JsError) {
        log::error!("Uncaught error in microtask: {}", error);
        self.uncaught.borrow_mut().push(error.clone());
    }
}

/// A single-threaded event loop hosting one [`Runtime`].
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Task};
///
/// let event_loop = EventLoop::new();
/// event_loop.enqueue_task(Task::new(|| Ok(())));
/// event_loop.run_until_done().unwrap();
/// assert!(event_loop.is_task_queue_empty());
/// ```
#[derive(Debug)]
pub struct EventLoop {
    host: Rc<LoopHost>,
    runtime: Runtime,
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues and default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates an EventLoop whose runtime uses `config`.
    pub fn with_config(config: RuntimeConfig) -> Self {
        let host = Rc::new(LoopHost {
            scheduling: config.scheduling,
            ..LoopHost::default()
        });
        let runtime = Runtime::with_config(host.clone(), config);
        Self { host, runtime }
    }

    /// The runtime driven by this loop.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Runs the event loop until all tasks and microtasks are processed.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all tasks completed successfully, or the error of the
    /// first failing task. Failing microtasks do not stop the loop; see
    /// [`take_uncaught_errors`](EventLoop::take_uncaught_errors).
    pub fn run_until_done(&self) -> Result<(), JsError> {
        self.perform_checkpoint()?;
        while let Some(task) = self.host.next_task() {
            task.run()?;
            self.perform_checkpoint()?;
        }
        Ok(())
    }

    /// Processes one complete cycle: one task followed by its checkpoint.
    pub fn process_one_cycle(&self) -> Result<(), JsError> {
        self.perform_checkpoint()?;
        if let Some(task) = self.host.next_task() {
            task.run()?;
        }
        self.perform_checkpoint()
    }

    /// Runs every queued checkpoint, including ones queued while running.
    pub fn perform_checkpoint(&self) -> Result<(), JsError> {
        while let Some(checkpoint) = self.host.next_checkpoint() {
            checkpoint.run()?;
        }
        Ok(())
    }

    /// Adds a task to the task queue.
    pub fn enqueue_task(&self, task: Task) {
        self.host.queue_task(task);
    }

    /// Adds a microtask to the runtime's microtask queue.
    pub fn enqueue_microtask(&self, microtask: MicroTask) {
        self.runtime.enqueue_microtask(microtask);
    }

    /// Drains the microtask queue right away.
    pub fn run_all_microtasks(&self) {
        self.runtime.run_microtasks();
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.host.tasks.borrow().is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.runtime.pending_microtasks() == 0
    }

    /// Errors reported by the runtime since the last call.
    pub fn take_uncaught_errors(&self) -> Vec<JsError> {
        self.host.uncaught.take()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
