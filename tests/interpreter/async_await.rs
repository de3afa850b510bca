//! Async functions, await, and host-settled promises

use super::{eval_global, run_to_completion, s};
use stepjs::{Interpreter, JsValue, StepResult};

#[test]
fn test_async_function_returns_promise() {
    assert_eq!(
        eval_global("async function f() { return 1; } var out = f() instanceof Promise;", "out"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_await_ordering() {
    assert_eq!(
        eval_global(
            r#"
            var log = [];
            var out;
            async function f() {
                log.push('start');
                const v = await 10;
                log.push('resumed ' + v);
                return v * 2;
            }
            f().then(v => { log.push('result ' + v); out = log.join(); });
            log.push('sync end');
            "#,
            "out"
        ),
        s("start,sync end,resumed 10,result 20")
    );
}

#[test]
fn test_await_rejection_is_catchable() {
    assert_eq!(
        eval_global(
            "var out; async function f() { try { await Promise.reject(new Error('nope')); } catch (e) { out = e.message; } } f();",
            "out"
        ),
        s("nope")
    );
}

#[test]
fn test_async_throw_rejects_promise() {
    assert_eq!(
        eval_global("var out; async function f() { throw 'bad'; } f().catch(e => { out = e; });", "out"),
        s("bad")
    );
}

#[test]
fn test_async_arrow_and_sequential_awaits() {
    assert_eq!(
        eval_global(
            "var out; const add = async (a, b) => (await a) + (await b); add(Promise.resolve(1), 2).then(v => { out = v; });",
            "out"
        ),
        JsValue::Number(3.0)
    );
}

#[test]
fn test_await_in_loop() {
    assert_eq!(
        eval_global(
            "var out; async function f() { let sum = 0; for (const x of [1, 2, 3]) sum += await x; return sum; } f().then(v => { out = v; });",
            "out"
        ),
        JsValue::Number(6.0)
    );
}

#[test]
fn test_finally_after_await() {
    assert_eq!(
        eval_global(
            "var log = []; var out; async function f() { try { await 1; return 'r'; } finally { log.push('fin'); } } f().then(v => { out = log.join() + v; });",
            "out"
        ),
        s("finr")
    );
}

#[test]
fn test_host_promise_suspends_until_resolved() {
    let mut interp = Interpreter::new();
    let pending = interp.create_pending_promise();
    let fetch = interp.create_host_function("fetchValue", move |_interp, _this, _args| {
        Ok(JsValue::Object(pending.clone()))
    });
    let global = interp.get_global("globalThis").unwrap();
    let JsValue::Object(global) = global else {
        panic!("globalThis is not an object");
    };
    global
        .borrow_mut()
        .set_data("fetchValue", JsValue::Object(fetch));

    interp
        .prepare("var out; async function main() { out = await fetchValue(); } main();")
        .unwrap();

    let waiting = match run_to_completion(&mut interp).unwrap() {
        StepResult::Suspended { pending } => pending,
        other => panic!("expected Suspended, got {:?}", other),
    };
    assert_eq!(waiting.len(), 1);
    assert_eq!(interp.get_global("out").unwrap(), JsValue::Undefined);

    let promise = waiting.first().unwrap().clone();
    interp.resolve_promise(&promise, JsValue::from("payload")).unwrap();
    let result = run_to_completion(&mut interp).unwrap();
    assert!(matches!(result, StepResult::Done | StepResult::Complete(_)));
    assert_eq!(interp.get_global("out").unwrap(), s("payload"));
}

#[test]
fn test_host_promise_rejection_reaches_script() {
    let mut interp = Interpreter::new();
    let pending = interp.create_pending_promise();
    let global = interp.get_global("globalThis").unwrap();
    let JsValue::Object(global) = global else {
        panic!("globalThis is not an object");
    };
    global
        .borrow_mut()
        .set_data("hostPromise", JsValue::Object(pending.clone()));

    interp
        .prepare("var out; hostPromise.catch(e => { out = 'rejected: ' + e; });")
        .unwrap();
    assert!(matches!(run_to_completion(&mut interp).unwrap(), StepResult::Suspended { .. }));

    interp.reject_promise(&pending, JsValue::from("denied")).unwrap();
    run_to_completion(&mut interp).unwrap();
    assert_eq!(interp.get_global("out").unwrap(), s("rejected: denied"));
    assert!(interp.reject_promise(&pending, JsValue::Undefined).is_err());
}

#[test]
fn test_unawaited_host_promise_does_not_suspend() {
    let mut interp = Interpreter::new();
    let _pending = interp.create_pending_promise();
    interp.prepare("1 + 1").unwrap();
    match run_to_completion(&mut interp).unwrap() {
        StepResult::Complete(value) => assert_eq!(value, JsValue::Number(2.0)),
        other => panic!("expected Complete, got {:?}", other),
    }
}
