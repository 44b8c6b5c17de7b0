//! The runtime: microtask queue, host scheduling and rejection hooks.
//!
//! A [`Runtime`] is created explicitly by the embedder and handed to every
//! promise and driver that needs it. It owns the microtask queue and asks its
//! [`HostScheduler`] to flush that queue, preferring the host's checkpoint
//! primitive and falling back to an ordinary task.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use core_types::JsError;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::rejection::{LogRejectionHooks, RejectionHooks};
use crate::task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue};

/// Scheduling primitives provided by the host.
pub trait HostScheduler {
    /// Queues a task to run in a later turn of the host's loop.
    fn queue_task(&self, task: Task);

    /// Queues a task to run as soon as the host's current task finishes.
    ///
    /// Hosts without such a primitive hand the task back, and the runtime
    /// falls back to [`queue_task`](HostScheduler::queue_task).
    fn queue_checkpoint(&self, task: Task) -> Result<(), Task> {
        Err(task)
    }

    /// Receives a failure no script code caught.
    fn report_error(&self, error: &JsError) {
        log::error!("Uncaught error in microtask: {}", error);
    }
}

struct RuntimeInner {
    host: Rc<dyn HostScheduler>,
    microtasks: RefCell<MicrotaskQueue>,
    // Runs once `microtasks` is empty, before the drain returns.
    after_drain: RefCell<TaskQueue>,
    flush_scheduled: Cell<bool>,
    draining: Cell<bool>,
    config: RuntimeConfig,
    hooks: OnceCell<Box<dyn RejectionHooks>>,
    next_promise_id: Cell<u64>,
}

/// Shared handle to a runtime instance.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, MicroTask};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let event_loop = EventLoop::new();
/// let runtime = event_loop.runtime().clone();
///
/// let ran = Rc::new(Cell::new(false));
/// let flag = ran.clone();
/// runtime.enqueue_microtask(MicroTask::new(move || {
///     flag.set(true);
///     Ok(())
/// }));
///
/// event_loop.run_until_done().unwrap();
/// assert!(ran.get());
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    pub fn new(host: Rc<dyn HostScheduler>) -> Self {
        Self::with_config(host, RuntimeConfig::default())
    }

    /// Creates a runtime with an explicit configuration.
    pub fn with_config(host: Rc<dyn HostScheduler>, config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                host,
                microtasks: RefCell::new(MicrotaskQueue::new()),
                after_drain: RefCell::new(TaskQueue::new()),
                flush_scheduled: Cell::new(false),
                draining: Cell::new(false),
                config,
                hooks: OnceCell::new(),
                next_promise_id: Cell::new(1),
            }),
        }
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Appends a microtask and makes sure a flush is scheduled.
    pub fn enqueue_microtask(&self, microtask: MicroTask) {
        self.inner.microtasks.borrow_mut().enqueue(microtask);
        self.schedule_flush();
    }

    /// Number of microtasks waiting for the next drain.
    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtasks.borrow().len()
    }

    /// Queues a task with the host.
    pub fn queue_task(&self, task: Task) {
        self.inner.host.queue_task(task);
    }

    /// Drains the microtask queue until it is empty.
    ///
    /// Microtasks queued by running microtasks run in the same pass. A
    /// failing microtask is reported to the host and draining continues.
    /// Work deferred with [`defer_until_drained`](Runtime::defer_until_drained)
    /// runs once the queue is empty; if it queues more microtasks, those are
    /// drained before returning. Calling this from inside a microtask does
    /// nothing; the outer drain picks up the remaining work.
    pub fn run_microtasks(&self) {
        if self.inner.draining.replace(true) {
            return;
        }
        self.inner.flush_scheduled.set(false);

        let mut ran = 0usize;
        loop {
            loop {
                let next = self.inner.microtasks.borrow_mut().dequeue();
                let Some(microtask) = next else {
                    break;
                };
                ran += 1;
                if let Err(error) = microtask.run() {
                    self.inner.host.report_error(&error);
                }
            }

            let mut deferred = std::mem::take(&mut *self.inner.after_drain.borrow_mut());
            if deferred.is_empty() {
                break;
            }
            while let Some(task) = deferred.dequeue() {
                if let Err(error) = task.run() {
                    self.inner.host.report_error(&error);
                }
            }
        }

        self.inner.draining.set(false);
        log::trace!("drained {} microtasks", ran);
    }

    /// Queues work to run at the end of the current (or next) microtask
    /// drain, after every pending microtask has run.
    pub fn defer_until_drained(&self, task: Task) {
        self.inner.after_drain.borrow_mut().enqueue(task);
        self.schedule_flush();
    }

    /// Installs the host's rejection hooks.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::HooksAlreadyInstalled`] on a second call.
    pub fn install_rejection_hooks(
        &self,
        hooks: Box<dyn RejectionHooks>,
    ) -> Result<(), RuntimeError> {
        self.inner
            .hooks
            .set(hooks)
            .map_err(|_| RuntimeError::HooksAlreadyInstalled)
    }

    /// The installed rejection hooks, or the logging fallback.
    pub fn rejection_hooks(&self) -> &dyn RejectionHooks {
        match self.inner.hooks.get() {
            Some(hooks) => hooks.as_ref(),
            None => &LogRejectionHooks,
        }
    }

    pub(crate) fn report_error(&self, error: &JsError) {
        self.inner.host.report_error(error);
    }

    pub(crate) fn next_promise_id(&self) -> u64 {
        let id = self.inner.next_promise_id.get();
        self.inner.next_promise_id.set(id + 1);
        id
    }

    /// Returns true if both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.get() || self.inner.draining.get() {
            return;
        }
        self.inner.flush_scheduled.set(true);

        let flush = flush_task(Rc::downgrade(&self.inner));
        if let Err(task) = self.inner.host.queue_checkpoint(flush) {
            log::debug!("host declined a microtask checkpoint, flushing in a task");
            self.inner.host.queue_task(task);
        }
    }
}

fn flush_task(runtime: Weak<RuntimeInner>) -> Task {
    Task::new(move || {
        if let Some(inner) = runtime.upgrade() {
            Runtime { inner }.run_microtasks();
        }
        Ok(())
    })
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("pending_microtasks", &self.pending_microtasks())
            .finish_non_exhaustive()
    }
}
