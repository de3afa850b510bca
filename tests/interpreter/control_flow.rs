//! Loops, labels, switch and exception handling

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_for_loop_with_break_completes_undefined() {
    assert_eq!(eval("for (;;) { break; }"), JsValue::Undefined);
}

#[test]
fn test_loop_completion_value() {
    assert_eq!(eval("let i = 0; while (i < 3) { i++; }"), JsValue::Number(2.0));
    assert_eq!(eval("1; do { 'x'; } while (false)"), s("x"));
}

#[test]
fn test_for_loop_sum() {
    assert_eq!(eval("let sum = 0; for (let i = 1; i <= 10; i++) { sum += i; } sum"), JsValue::Number(55.0));
}

#[test]
fn test_for_let_closures_capture_each_iteration() {
    assert_eq!(
        eval("const fs = []; for (let i = 0; i < 3; i++) { fs.push(() => i); } fs.map(f => f()).join()"),
        s("0,1,2")
    );
    assert_eq!(
        eval("const fs = []; for (var i = 0; i < 3; i++) { fs.push(() => i); } fs.map(f => f()).join()"),
        s("3,3,3")
    );
}

#[test]
fn test_continue() {
    assert_eq!(
        eval("let out = ''; for (let i = 0; i < 5; i++) { if (i % 2) continue; out += i; } out"),
        s("024")
    );
}

#[test]
fn test_labeled_break_and_continue() {
    assert_eq!(
        eval(
            r#"
            let count = 0;
            outer: for (let i = 0; i < 3; i++) {
                for (let j = 0; j < 3; j++) {
                    if (j === 1) continue outer;
                    if (i === 2) break outer;
                    count++;
                }
            }
            count
            "#
        ),
        JsValue::Number(2.0)
    );
    assert_eq!(eval("block: { 1; break block; 2; }"), JsValue::Number(1.0));
}

#[test]
fn test_for_in_enumerates_own_then_inherited() {
    assert_eq!(
        eval(
            r#"
            const proto = { inherited: 1 };
            const o = Object.create(proto);
            o.b = 2; o.a = 3; o[1] = 4; o[0] = 5;
            const keys = [];
            for (const k in o) keys.push(k);
            keys.join()
            "#
        ),
        s("0,1,b,a,inherited")
    );
}

#[test]
fn test_for_in_skips_deleted_keys() {
    assert_eq!(
        eval("const o = { a: 1, b: 2, c: 3 }; const seen = []; for (const k in o) { delete o.c; seen.push(k); } seen.join()"),
        s("a,b")
    );
}

#[test]
fn test_for_of_closes_iterator_on_break() {
    assert_eq!(
        eval(
            r#"
            let closed = false;
            const iterable = {
                [Symbol.iterator]() {
                    let n = 0;
                    return {
                        next() { n++; return { value: n, done: false }; },
                        return() { closed = true; return {}; },
                    };
                },
            };
            for (const x of iterable) { if (x === 2) break; }
            closed
            "#
        ),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_switch_fallthrough_and_default() {
    let source = |v: &str| {
        format!(
            r#"
            let out = '';
            switch ({}) {{
                case 1: out += 'one';
                case 2: out += 'two'; break;
                default: out += 'default';
                case 3: out += 'three';
            }}
            out
            "#,
            v
        )
    };
    assert_eq!(eval(&source("1")), s("onetwo"));
    assert_eq!(eval(&source("3")), s("three"));
    assert_eq!(eval(&source("9")), s("defaultthree"));
}

#[test]
fn test_try_catch_finally_order() {
    assert_eq!(
        eval("let log = ''; try { log += 't'; throw 1; } catch (e) { log += 'c' + e; } finally { log += 'f'; } log"),
        s("tc1f")
    );
}

#[test]
fn test_finally_return_overrides() {
    assert_eq!(
        eval("function f() { try { throw 1 } catch (e) { return e } finally { return 2 } } f()"),
        JsValue::Number(2.0)
    );
    assert_eq!(
        eval("function f() { try { return 1; } finally { return 2; } } f()"),
        JsValue::Number(2.0)
    );
}

#[test]
fn test_finally_runs_on_break() {
    assert_eq!(
        eval("let log = ''; for (;;) { try { break; } finally { log += 'f'; } } log"),
        s("f")
    );
}

#[test]
fn test_catch_without_binding() {
    assert_eq!(eval("let r; try { null.x; } catch { r = 'caught'; } r"), s("caught"));
}

#[test]
fn test_caught_type_error_is_error_object() {
    assert_eq!(
        eval("try { null.x; } catch (e) { e instanceof TypeError && e.message.length > 0 }"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_uncaught_throw_reports_value() {
    assert!(throws_error("throw new RangeError('too far')", "RangeError: too far"));
    assert!(throws_error("throw 'plain'", "plain"));
}

#[test]
fn test_if_else_chain() {
    assert_eq!(eval("const x = 5; if (x < 3) 'small'; else if (x < 10) 'medium'; else 'large'"), s("medium"));
}
