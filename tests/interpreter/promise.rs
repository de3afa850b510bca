//! Promise built-ins and microtask ordering

use super::{eval_global, run_to_completion, s, throws_error};
use stepjs::{Interpreter, JsValue};

#[test]
fn test_then_runs_after_script() {
    assert_eq!(
        eval_global(
            "var log = []; Promise.resolve(1).then(v => log.push('then ' + v)); log.push('sync'); var out; Promise.resolve().then(() => { out = log.join(); });",
            "out"
        ),
        s("sync,then 1")
    );
}

#[test]
fn test_microtasks_run_fifo() {
    assert_eq!(
        eval_global(
            r#"
            var log = [];
            var out;
            Promise.resolve().then(() => log.push('a1')).then(() => log.push('a2'));
            Promise.resolve().then(() => log.push('b1')).then(() => log.push('b2'));
            Promise.resolve().then(() => 0).then(() => 0).then(() => { out = log.join(); });
            "#,
            "out"
        ),
        s("a1,b1,a2,b2")
    );
}

#[test]
fn test_executor_runs_synchronously() {
    assert_eq!(
        eval_global("var log = []; new Promise(resolve => { log.push('executor'); resolve(); }); log.push('after'); var out = log.join();", "out"),
        s("executor,after")
    );
}

#[test]
fn test_resolve_with_thenable_adopts_state() {
    assert_eq!(
        eval_global(
            "var out; const thenable = { then(resolve) { resolve(42); } }; Promise.resolve(thenable).then(v => { out = v; });",
            "out"
        ),
        JsValue::Number(42.0)
    );
}

#[test]
fn test_chained_values() {
    assert_eq!(
        eval_global("var out; Promise.resolve(2).then(v => v * 3).then(v => Promise.resolve(v + 1)).then(v => { out = v; });", "out"),
        JsValue::Number(7.0)
    );
}

#[test]
fn test_catch_and_rethrow() {
    assert_eq!(
        eval_global(
            "var out; Promise.reject(new Error('bad')).then(() => 'skipped').catch(e => e.message).then(v => { out = v; });",
            "out"
        ),
        s("bad")
    );
    assert_eq!(
        eval_global(
            "var out; Promise.resolve().then(() => { throw 'inner'; }).catch(e => { out = 'caught ' + e; });",
            "out"
        ),
        s("caught inner")
    );
}

#[test]
fn test_finally_passes_value_through() {
    assert_eq!(
        eval_global(
            "var log = []; var out; Promise.resolve(5).finally(() => { log.push('fin'); return 99; }).then(v => { out = log.join() + ':' + v; });",
            "out"
        ),
        s("fin:5")
    );
    assert_eq!(
        eval_global(
            "var out; Promise.reject('r').finally(() => {}).catch(e => { out = e; });",
            "out"
        ),
        s("r")
    );
}

#[test]
fn test_promise_all() {
    assert_eq!(
        eval_global(
            "var out; Promise.all([1, Promise.resolve(2), new Promise(r => r(3))]).then(vs => { out = vs.join(); });",
            "out"
        ),
        s("1,2,3")
    );
    assert_eq!(
        eval_global("var out; Promise.all([]).then(vs => { out = vs.length; });", "out"),
        JsValue::Number(0.0)
    );
    assert_eq!(
        eval_global(
            "var out; Promise.all([Promise.resolve(1), Promise.reject('no')]).catch(e => { out = e; });",
            "out"
        ),
        s("no")
    );
}

#[test]
fn test_promise_race() {
    assert_eq!(
        eval_global(
            "var out; Promise.race([new Promise(() => {}), Promise.resolve('fast')]).then(v => { out = v; });",
            "out"
        ),
        s("fast")
    );
}

#[test]
fn test_resolving_functions_settle_once() {
    assert_eq!(
        eval_global(
            "var out; new Promise((resolve, reject) => { resolve(1); reject(2); resolve(3); }).then(v => { out = v; });",
            "out"
        ),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_executor_throw_rejects() {
    assert_eq!(
        eval_global("var out; new Promise(() => { throw 'oops'; }).catch(e => { out = e; });", "out"),
        s("oops")
    );
}

#[test]
fn test_self_resolution_is_type_error() {
    assert_eq!(
        eval_global(
            "var out; let resolve; const p = new Promise(r => { resolve = r; }); resolve(p); p.catch(e => { out = e instanceof TypeError; });",
            "out"
        ),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_promise_requires_new() {
    assert!(throws_error("Promise(() => {})", "TypeError"));
}

#[test]
fn test_unhandled_rejections_are_reported() {
    let mut interp = Interpreter::new();
    interp
        .prepare("Promise.reject('lost'); Promise.reject('kept').catch(() => {});")
        .unwrap();
    run_to_completion(&mut interp).unwrap();
    let unhandled = interp.take_unhandled_rejections();
    assert_eq!(unhandled, vec![s("lost")]);
    assert!(interp.take_unhandled_rejections().is_empty());
}

#[test]
fn test_promise_to_string_tag() {
    assert_eq!(
        eval_global("var out = Object.prototype.toString.call(Promise.resolve());", "out"),
        s("[object Promise]")
    );
}
