//! Generator functions and the generator object protocol

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_generator_yields_in_order() {
    assert_eq!(
        eval("function* g() { yield 1; yield 2; return 3; } const it = g(); [it.next().value, it.next().value, it.next().value, it.next().done].join()"),
        s("1,2,3,true")
    );
}

#[test]
fn test_generator_body_is_lazy() {
    assert_eq!(
        eval("let started = false; function* g() { started = true; yield 1; } const it = g(); const before = started; it.next(); [before, started].join()"),
        s("false,true")
    );
}

#[test]
fn test_next_argument_becomes_yield_result() {
    assert_eq!(
        eval("function* g() { const a = yield 1; const b = yield a + 1; return a + b; } const it = g(); it.next('ignored'); it.next(10); it.next(20).value"),
        JsValue::Number(30.0)
    );
}

#[test]
fn test_return_runs_finally() {
    assert_eq!(
        eval(
            r#"
            let log = '';
            function* g() { try { yield 1; yield 2; } finally { log += 'cleanup'; } }
            const it = g();
            it.next();
            const r = it.return(42);
            [r.value, r.done, log, it.next().done].join()
            "#
        ),
        s("42,true,cleanup,true")
    );
}

#[test]
fn test_return_before_start_completes_immediately() {
    assert_eq!(
        eval("let ran = false; function* g() { ran = true; yield 1; } const it = g(); const r = it.return(5); [r.value, r.done, ran].join()"),
        s("5,true,false")
    );
}

#[test]
fn test_throw_is_catchable_inside_generator() {
    assert_eq!(
        eval(
            r#"
            function* g() {
                try { yield 1; } catch (e) { yield 'caught ' + e; }
            }
            const it = g();
            it.next();
            it.throw('boom').value
            "#
        ),
        s("caught boom")
    );
}

#[test]
fn test_throw_on_fresh_generator_propagates() {
    assert!(throws_error("function* g() { yield 1; } g().throw(new Error('early'))", "early"));
}

#[test]
fn test_yield_star_delegates() {
    assert_eq!(
        eval("function* inner() { yield 1; yield 2; return 'r'; } function* outer() { const x = yield* inner(); yield x; } [...outer()].join()"),
        s("1,2,r")
    );
    assert_eq!(eval("function* g() { yield* [3, 4]; } [...g()].join()"), s("3,4"));
}

#[test]
fn test_yield_star_forwards_return_to_inner() {
    assert_eq!(
        eval(
            r#"
            let innerClosed = false;
            function* inner() { try { yield 1; yield 2; } finally { innerClosed = true; } }
            function* outer() { yield* inner(); }
            const it = outer();
            it.next();
            it.return();
            innerClosed
            "#
        ),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_generator_is_iterable() {
    assert_eq!(
        eval("function* range(n) { for (let i = 0; i < n; i++) yield i; } let sum = 0; for (const x of range(5)) sum += x; sum"),
        JsValue::Number(10.0)
    );
    assert_eq!(eval("function* g() {} const it = g(); it[Symbol.iterator]() === it"), JsValue::Boolean(true));
}

#[test]
fn test_for_of_break_closes_generator() {
    assert_eq!(
        eval(
            r#"
            let closed = false;
            function* g() { try { yield 1; yield 2; } finally { closed = true; } }
            for (const x of g()) break;
            closed
            "#
        ),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_generator_running_reentry_throws() {
    assert!(throws_error(
        "let it; function* g() { it.next(); yield 1; } it = g(); it.next()",
        "already running"
    ));
}

#[test]
fn test_generator_to_string_tag() {
    assert_eq!(eval("function* g() {} Object.prototype.toString.call(g())"), s("[object Generator]"));
}

#[test]
fn test_generator_is_not_constructor() {
    assert!(throws_error("function* g() {} new g()", "not a constructor"));
}
