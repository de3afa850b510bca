//! Functions, closures, `this`, arguments and Function.prototype

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_closure_counter() {
    assert_eq!(
        eval("function counter() { let n = 0; return () => ++n; } const c = counter(); c(); c(); c()"),
        JsValue::Number(3.0)
    );
}

#[test]
fn test_default_and_rest_parameters() {
    assert_eq!(eval("function f(a, b = a * 2, ...rest) { return a + b + rest.length; } f(1)"), JsValue::Number(3.0));
    assert_eq!(eval("function f(a, b = a * 2, ...rest) { return a + b + rest.length; } f(1, 1, 0, 0)"), JsValue::Number(4.0));
}

#[test]
fn test_function_length_and_name() {
    assert_eq!(eval("function f(a, b = 1, c) {} f.length"), JsValue::Number(1.0));
    assert_eq!(eval("const g = function () {}; g.name"), s("g"));
    assert_eq!(eval("const h = () => {}; h.name"), s("h"));
    assert_eq!(eval("({ m() {} }).m.name"), s("m"));
}

#[test]
fn test_this_binding() {
    assert_eq!(eval("const o = { v: 4, get() { return this.v; } }; o.get()"), JsValue::Number(4.0));
    assert_eq!(
        eval("const o = { v: 4, get() { return (() => this.v)(); } }; o.get()"),
        JsValue::Number(4.0)
    );
    assert_eq!(eval("function f() { return this; } f() === globalThis"), JsValue::Boolean(true));
    assert_eq!(eval("function f() { 'use strict'; return this; } f()"), JsValue::Undefined);
}

#[test]
fn test_call_apply_bind() {
    assert_eq!(eval("function f(a, b) { return this.x + a + b; } f.call({ x: 1 }, 2, 3)"), JsValue::Number(6.0));
    assert_eq!(eval("function f(a, b) { return this.x + a + b; } f.apply({ x: 1 }, [2, 3])"), JsValue::Number(6.0));
    assert_eq!(
        eval("function f(a, b) { return this.x + a + b; } const g = f.bind({ x: 1 }, 2); g(3)"),
        JsValue::Number(6.0)
    );
    assert_eq!(eval("function f(a, b) {} f.bind(null, 1).length"), JsValue::Number(1.0));
    assert_eq!(eval("function f() {} f.bind(null).name"), s("bound f"));
}

#[test]
fn test_apply_with_array_like() {
    assert_eq!(
        eval("function count() { return arguments.length; } count.apply(null, { length: 3, 0: 'a' })"),
        JsValue::Number(3.0)
    );
    assert!(throws_error("(function () {}).apply(null, { length: 2 ** 32 - 1 })", "RangeError"));
    assert_eq!(
        eval("try { (function () {}).apply(null, { length: 2 ** 53 - 1 }); } catch (e) { e instanceof RangeError }"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_bound_constructor_ignores_bound_this() {
    assert_eq!(
        eval("function P(x) { this.x = x; } const B = P.bind({ ignored: true }, 7); const p = new B(); p.x + (p instanceof P ? 1 : 0)"),
        JsValue::Number(8.0)
    );
}

#[test]
fn test_arguments_object() {
    assert_eq!(eval("function f() { return arguments.length; } f(1, 2, 3)"), JsValue::Number(3.0));
    assert_eq!(eval("function f(a) { arguments[0] = 9; return a; } f(1)"), JsValue::Number(1.0));
    assert!(throws_error("(() => arguments)()", "arguments is not defined"));
}

#[test]
fn test_constructor_and_prototype() {
    assert_eq!(
        eval(
            r#"
            function Point(x, y) { this.x = x; this.y = y; }
            Point.prototype.sum = function () { return this.x + this.y; };
            const p = new Point(2, 3);
            p.sum() + (p.constructor === Point ? 100 : 0)
            "#
        ),
        JsValue::Number(105.0)
    );
}

#[test]
fn test_constructor_returning_object_wins() {
    assert_eq!(eval("function F() { this.a = 1; return { a: 2 }; } new F().a"), JsValue::Number(2.0));
    assert_eq!(eval("function F() { this.a = 1; return 5; } new F().a"), JsValue::Number(1.0));
}

#[test]
fn test_new_target() {
    assert_eq!(eval("function F() { return new.target === F; } F()"), JsValue::Boolean(false));
    assert_eq!(eval("let seen; function F() { seen = new.target === F; } new F(); seen"), JsValue::Boolean(true));
}

#[test]
fn test_arrow_is_not_constructor() {
    assert!(throws_error("const A = () => {}; new A()", "not a constructor"));
}

#[test]
fn test_calling_non_function_throws() {
    assert!(throws_error("const o = {}; o.missing()", "is not a function"));
}

#[test]
fn test_recursion() {
    assert_eq!(eval("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15)"), JsValue::Number(610.0));
}

#[test]
fn test_deep_recursion_is_range_error() {
    assert!(throws_error("function f() { return f(); } f()", "Maximum call stack size exceeded"));
}

#[test]
fn test_function_constructor() {
    assert_eq!(eval("const add = new Function('a', 'b', 'return a + b'); add(2, 3)"), JsValue::Number(5.0));
}

#[test]
fn test_getters_and_setters() {
    assert_eq!(
        eval("const o = { _v: 1, get v() { return this._v * 10; }, set v(x) { this._v = x; } }; o.v = 3; o.v"),
        JsValue::Number(30.0)
    );
}

#[test]
fn test_block_function_declaration_annex_b() {
    assert_eq!(eval("{ function inner() { return 1; } } typeof inner"), s("function"));
}
