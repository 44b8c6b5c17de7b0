//! Async runtime: microtasks, promises and the async driver.
//!
//! This crate provides the asynchronous half of the engine:
//! - A microtask queue drained to empty before the host moves on
//! - Promises that settle once and notify reactions in registration order
//! - Tracking and reporting of rejections nobody handled
//! - A driver that runs generator bodies as async functions and async
//!   generators
//!
//! # Overview
//!
//! - [`Runtime`] - Owns the microtask queue, talks to the [`HostScheduler`]
//! - [`Promise`] - Single-settlement promise with `then`/`catch`/`finally`
//! - [`AsyncIterator`] - Promise-returning iterator over a [`generator_runtime::Generator`]
//! - [`EventLoop`] - Bundled host with task and checkpoint queues
//!
//! # Examples
//!
//! ## Promise Usage
//!
//! ```
//! use async_runtime::{EventLoop, Promise, PromiseState};
//! use core_types::Value;
//!
//! let event_loop = EventLoop::new();
//! let promise = Promise::new(event_loop.runtime());
//! promise.resolve(Value::Smi(42));
//! assert_eq!(promise.state(), PromiseState::Fulfilled);
//! ```
//!
//! ## Async Function Usage
//!
//! ```
//! use async_runtime::{run_async, EventLoop, Promise};
//! use core_types::Value;
//! use generator_runtime::{Generator, Step};
//!
//! let event_loop = EventLoop::new();
//! let runtime = event_loop.runtime().clone();
//! let pending = Promise::new(&runtime);
//! let awaited = pending.clone();
//!
//! // async function () { return (await pending) * 2; }
//! let completion = run_async(
//!     &runtime,
//!     Generator::new(
//!         move |ctx| match ctx.next {
//!             0 => {
//!                 ctx.next = 1;
//!                 Ok(Step::Yield(Value::awrap(awaited.to_value())))
//!             }
//!             _ => {
//!                 ctx.rval = Value::Smi(ctx.sent.as_smi().unwrap_or(0) * 2);
//!                 ctx.stop()
//!             }
//!         },
//!         vec![],
//!     ),
//! );
//!
//! pending.resolve(Value::Smi(21));
//! event_loop.run_until_done().unwrap();
//! assert_eq!(completion.result(), Some(Value::Smi(42)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod combinators;
pub mod config;
pub mod driver;
pub mod error;
pub mod event_loop;
pub mod promise;
pub mod rejection;
pub mod runtime;
pub mod task_queue;

// Re-export main types at crate root
pub use config::{RejectionCheckTiming, RuntimeConfig, Scheduling};
pub use driver::{async_call, run_async, AsyncCall, AsyncIterator, AsyncKind};
pub use error::RuntimeError;
pub use event_loop::EventLoop;
pub use promise::{
    Handler, OnFulfilled, OnRejected, Promise, PromiseReaction, PromiseState, RejectionTracking,
};
pub use rejection::{LogRejectionHooks, RejectionHooks};
pub use runtime::{HostScheduler, Runtime};
pub use task_queue::{JobQueue, MicroTask, MicrotaskQueue, Task, TaskQueue};
