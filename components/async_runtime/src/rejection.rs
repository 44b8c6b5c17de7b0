//! Unhandled-rejection tracking.
//!
//! When a rejected promise finishes draining its reactions without any
//! failure handler having been attached, a deferred check is scheduled. If
//! the rejection is still unobserved when the check runs, it is reported to
//! the host through [`RejectionHooks::unhandled_rejection`]. A failure
//! handler attached after that report triggers
//! [`RejectionHooks::rejection_handled`].
//!
//! Promises rejected only because an upstream rejection passed through them
//! are never reported themselves; handling one marks the upstream handled.

use core_types::JsError;

use crate::config::RejectionCheckTiming;
use crate::promise::Promise;
use crate::runtime::Runtime;
use crate::task_queue::Task;

/// Host hooks for rejection reporting.
pub trait RejectionHooks {
    /// A rejection went unobserved past the reporting deadline.
    fn unhandled_rejection(&self, promise: &Promise, reason: &JsError);

    /// A previously reported rejection gained a failure handler.
    fn rejection_handled(&self, promise: &Promise);
}

/// Fallback hooks that report through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRejectionHooks;

impl RejectionHooks for LogRejectionHooks {
    fn unhandled_rejection(&self, promise: &Promise, reason: &JsError) {
        log::error!("Unhandled promise rejection (promise #{}): {}", promise.id(), reason);
    }

    fn rejection_handled(&self, promise: &Promise) {
        log::warn!(
            "Promise rejection was handled asynchronously (promise #{})",
            promise.id()
        );
    }
}

pub(crate) fn schedule_unhandled_check(promise: &Promise) {
    let target = promise.clone();
    defer(promise.runtime(), move || {
        if let Some(reason) = target.take_unhandled() {
            target
                .runtime()
                .rejection_hooks()
                .unhandled_rejection(&target, &reason);
        }
        Ok(())
    });
}

pub(crate) fn schedule_handled_notice(promise: &Promise) {
    let target = promise.clone();
    defer(promise.runtime(), move || {
        target.runtime().rejection_hooks().rejection_handled(&target);
        Ok(())
    });
}

fn defer<F>(runtime: &Runtime, f: F)
where
    F: FnOnce() -> Result<(), JsError> + 'static,
{
    match runtime.config().rejection_check {
        RejectionCheckTiming::NextTask => runtime.queue_task(Task::new(f)),
        RejectionCheckTiming::SameTick => runtime.defer_until_drained(Task::new(f)),
    }
}
