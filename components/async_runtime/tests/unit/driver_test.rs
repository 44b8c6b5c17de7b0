//! Unit tests for the async driver

use async_runtime::{async_call, run_async, AsyncCall, AsyncIterator, AsyncKind, EventLoop, Promise, PromiseState};
use core_types::{IteratorResult, JsError, Value};
use generator_runtime::{Generator, GeneratorState, Step, TryEntry, END};
use std::cell::RefCell;
use std::rc::Rc;

fn iter_result(promise: &Promise) -> IteratorResult {
    IteratorResult::from_value(&promise.result().expect("promise fulfilled")).unwrap()
}

/// async function () { try { return await p; } catch (e) { return "caught " + e; } }
fn await_with_catch(awaited: Promise) -> Generator {
    Generator::new(
        move |ctx| match ctx.next {
            0 => {
                ctx.next = 1;
                Ok(Step::Yield(Value::awrap(awaited.to_value())))
            }
            1 => {
                ctx.rval = ctx.sent.clone();
                ctx.next = END;
                Ok(Step::Continue)
            }
            2 => {
                let error = ctx.catch(0)?;
                ctx.rval = Value::String(format!("caught {}", error.message));
                ctx.next = END;
                Ok(Step::Continue)
            }
            _ => ctx.stop(),
        },
        vec![TryEntry::try_catch(0, 2)],
    )
}

#[test]
fn async_function_returns_awaited_value() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let awaited = Promise::new(runtime);

    let completion = run_async(runtime, await_with_catch(awaited.clone()));
    event_loop.run_until_done().unwrap();
    assert!(completion.is_pending());

    awaited.resolve(Value::Smi(42));
    event_loop.run_until_done().unwrap();
    assert_eq!(completion.result(), Some(Value::Smi(42)));
}

#[test]
fn rejected_await_is_thrown_into_body() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let awaited = Promise::rejected(runtime, JsError::error("boom"));

    let completion = run_async(runtime, await_with_catch(awaited));
    event_loop.run_until_done().unwrap();
    assert_eq!(completion.result(), Some(Value::from("caught boom")));
}

#[test]
fn uncaught_failure_rejects_completion() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let awaited = Promise::rejected(runtime, JsError::type_error("deep reason"));

    // async function () { await awaited; }
    let completion = run_async(
        runtime,
        Generator::new(
            move |ctx| match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Step::Yield(Value::awrap(awaited.to_value())))
                }
                _ => ctx.stop(),
            },
            vec![],
        ),
    );
    event_loop.run_until_done().unwrap();
    assert_eq!(completion.state(), PromiseState::Rejected);
    assert_eq!(completion.error().unwrap().message, "deep reason");
}

#[test]
fn awaiting_plain_value_still_defers() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();

    // async function () { log("before"); await 1; log("after"); }
    let completion = run_async(
        runtime,
        Generator::new(
            move |ctx| match ctx.next {
                0 => {
                    l.borrow_mut().push("before");
                    ctx.next = 1;
                    Ok(Step::Yield(Value::awrap(Value::Smi(1))))
                }
                _ => {
                    l.borrow_mut().push("after");
                    ctx.stop()
                }
            },
            vec![],
        ),
    );

    assert_eq!(*log.borrow(), vec!["before"]);
    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["before", "after"]);
    assert_eq!(completion.result(), Some(Value::Undefined));
}

#[test]
fn resumes_apply_in_issue_order() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime().clone();
    let gate = Promise::new(&runtime);
    let awaited = gate.clone();
    let entries = Rc::new(RefCell::new(Vec::new()));
    let log = entries.clone();

    // async function* () { const v = await gate; yield v; yield "second"; }
    let gen = Generator::new(
        move |ctx| {
            log.borrow_mut().push(ctx.next);
            match ctx.next {
                0 => {
                    ctx.next = 1;
                    Ok(Step::Yield(Value::awrap(awaited.to_value())))
                }
                1 => {
                    ctx.next = 2;
                    Ok(Step::Yield(ctx.sent.clone()))
                }
                2 => {
                    ctx.next = 3;
                    Ok(Step::Yield(Value::from("second")))
                }
                _ => ctx.stop(),
            }
        },
        vec![],
    );
    let iter = AsyncIterator::new(&runtime, gen);

    let first = iter.next(Value::Undefined);
    let second = iter.next(Value::Undefined);
    event_loop.run_until_done().unwrap();
    // The second next waits for the first, which waits for the gate.
    assert_eq!(*entries.borrow(), vec![0]);
    assert!(second.is_pending());

    gate.resolve(Value::from("gated"));
    event_loop.run_until_done().unwrap();

    assert_eq!(*entries.borrow(), vec![0, 1, 2]);
    assert_eq!(iter_result(&first).value, Value::from("gated"));
    assert_eq!(iter_result(&second).value, Value::from("second"));
}

#[test]
fn yielded_awaitable_is_resolved_before_reporting() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime().clone();
    let pending = Promise::new(&runtime);
    let yielded = pending.clone();

    let gen = Generator::new(
        move |ctx| match ctx.next {
            0 => {
                ctx.next = 1;
                Ok(Step::Yield(yielded.to_value()))
            }
            _ => ctx.stop(),
        },
        vec![],
    );
    let iter = AsyncIterator::new(&runtime, gen);
    let first = iter.next(Value::Undefined);

    pending.resolve(Value::Smi(9));
    event_loop.run_until_done().unwrap();
    let result = iter_result(&first);
    assert_eq!((result.value, result.done), (Value::Smi(9), false));
}

#[test]
fn rejected_yielded_awaitable_is_thrown_back() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime().clone();
    let rejected = Promise::rejected(&runtime, JsError::error("bad item"));

    // async function* () { try { yield rejected; } catch (e) { yield "recovered"; } }
    let gen = Generator::new(
        move |ctx| match ctx.next {
            0 => {
                ctx.next = 1;
                Ok(Step::Yield(rejected.to_value()))
            }
            1 => {
                ctx.next = END;
                Ok(Step::Continue)
            }
            2 => {
                ctx.catch(0)?;
                ctx.next = 3;
                Ok(Step::Yield(Value::from("recovered")))
            }
            _ => ctx.stop(),
        },
        vec![TryEntry::try_catch(0, 2)],
    );
    let iter = AsyncIterator::new(&runtime, gen);
    let first = iter.next(Value::Undefined);
    event_loop.run_until_done().unwrap();
    assert_eq!(iter_result(&first).value, Value::from("recovered"));
}

#[test]
fn return_runs_cleanup_and_completes() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime().clone();
    let cleanups = Rc::new(RefCell::new(0));
    let count = cleanups.clone();

    // async function* () { try { yield 1; } finally { cleanup(); } }
    let gen = Generator::new(
        move |ctx| match ctx.next {
            0 => {
                ctx.next = 1;
                Ok(Step::Yield(Value::Smi(1)))
            }
            1 => {
                ctx.next = 2;
                Ok(Step::Continue)
            }
            2 => {
                *count.borrow_mut() += 1;
                ctx.finish(2)
            }
            _ => ctx.stop(),
        },
        vec![TryEntry::try_finally(0, 2, 3)],
    );
    let iter = AsyncIterator::new(&runtime, gen);

    let first = iter.next(Value::Undefined);
    let returned = iter.return_value(Value::Smi(99));
    event_loop.run_until_done().unwrap();

    assert_eq!(iter_result(&first).value, Value::Smi(1));
    let result = iter_result(&returned);
    assert_eq!((result.value, result.done), (Value::Smi(99), true));
    assert_eq!(*cleanups.borrow(), 1);
    assert_eq!(iter.generator().state(), GeneratorState::Completed);
}

#[test]
fn throw_into_fresh_async_generator_rejects() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime().clone();
    let iter = AsyncIterator::new(&runtime, Generator::new(|ctx| ctx.stop(), vec![]));

    let thrown = iter.throw(JsError::error("early"));
    thrown.catch_error(|_| Ok(Value::Undefined));
    assert_eq!(thrown.error().unwrap().message, "early");

    // A later operation still runs once the failed one settled.
    let next = iter.next(Value::Undefined);
    event_loop.run_until_done().unwrap();
    assert!(iter_result(&next).done);
}

#[test]
fn async_call_distinguishes_functions_and_generators() {
    let event_loop = EventLoop::new();
    let runtime = event_loop.runtime();
    let runs = Rc::new(RefCell::new(0));

    let body = |runs: Rc<RefCell<i32>>| {
        Generator::new(
            move |ctx| {
                *runs.borrow_mut() += 1;
                ctx.rval = Value::from("value");
                ctx.stop()
            },
            vec![],
        )
    };

    let generator_call = async_call(runtime, body(runs.clone()), AsyncKind::Generator);
    assert!(matches!(generator_call, AsyncCall::Iterator(_)));
    assert_eq!(*runs.borrow(), 0);

    let function_call = async_call(runtime, body(runs.clone()), AsyncKind::Function);
    assert_eq!(*runs.borrow(), 1);
    let completion = function_call.into_completion().unwrap();
    event_loop.run_until_done().unwrap();
    assert_eq!(completion.result(), Some(Value::from("value")));

    let iter = generator_call.into_iterator().unwrap();
    let result = iter.next(Value::Undefined);
    event_loop.run_until_done().unwrap();
    assert_eq!(iter_result(&result).value, Value::from("value"));
}
