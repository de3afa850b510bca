//! Expressions, operators, conversions and bindings

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3"), JsValue::Number(7.0));
    assert_eq!(eval("(1 + 2) * 3"), JsValue::Number(9.0));
    assert_eq!(eval("2 ** 3 ** 2"), JsValue::Number(512.0));
    assert_eq!(eval("7 % 3"), JsValue::Number(1.0));
}

#[test]
fn test_string_concatenation_and_coercion() {
    assert_eq!(eval("'a' + 1 + 2"), s("a12"));
    assert_eq!(eval("1 + 2 + 'a'"), s("3a"));
    assert_eq!(eval("'3' * '4'"), JsValue::Number(12.0));
    assert_eq!(eval("[1, 2] + ''"), s("1,2"));
    assert_eq!(eval("({}) + ''"), s("[object Object]"));
}

#[test]
fn test_template_literals() {
    assert_eq!(eval("const n = 3; `n is ${n}, doubled ${n * 2}`"), s("n is 3, doubled 6"));
}

#[test]
fn test_number_to_string_shortest_form() {
    assert_eq!(eval("String(0.1 + 0.2)"), s("0.30000000000000004"));
    assert_eq!(eval("String(1e21)"), s("1e+21"));
    assert_eq!(eval("String(-0)"), s("0"));
    assert_eq!(eval("String(123456789012)"), s("123456789012"));
}

#[test]
fn test_string_to_number() {
    assert_eq!(eval("Number('  42  ')"), JsValue::Number(42.0));
    assert_eq!(eval("Number('')"), JsValue::Number(0.0));
    assert_eq!(eval("Number('0x1f')"), JsValue::Number(31.0));
    assert_eq!(eval("Number.isNaN(Number('12px'))"), JsValue::Boolean(true));
}

#[test]
fn test_equality() {
    assert_eq!(eval("0 === -0"), JsValue::Boolean(true));
    assert_eq!(eval("Object.is(0, -0)"), JsValue::Boolean(false));
    assert_eq!(eval("NaN === NaN"), JsValue::Boolean(false));
    assert_eq!(eval("Object.is(NaN, NaN)"), JsValue::Boolean(true));
    assert_eq!(eval("null == undefined"), JsValue::Boolean(true));
    assert_eq!(eval("null == 0"), JsValue::Boolean(false));
    assert_eq!(eval("'1' == 1"), JsValue::Boolean(true));
    assert_eq!(eval("true == 1"), JsValue::Boolean(true));
}

#[test]
fn test_typeof() {
    assert_eq!(eval("typeof undefined"), s("undefined"));
    assert_eq!(eval("typeof null"), s("object"));
    assert_eq!(eval("typeof function () {}"), s("function"));
    assert_eq!(eval("typeof Symbol()"), s("symbol"));
    assert_eq!(eval("typeof notDeclared"), s("undefined"));
}

#[test]
fn test_boxing() {
    assert_eq!(eval("typeof new Number(5)"), s("object"));
    assert_eq!(eval("typeof Number(5)"), s("number"));
    assert_eq!(eval("new Number(5) + 1"), JsValue::Number(6.0));
    assert_eq!(eval("new Boolean(false) ? 'yes' : 'no'"), s("yes"));
    assert_eq!(eval("typeof new String('x')"), s("object"));
}

#[test]
fn test_let_block_scoping() {
    assert_eq!(eval("let a = 0; if (true) { a = 1; } a;"), JsValue::Number(1.0));
    assert_eq!(eval("let a = 0; if (false) { a = 1; } else { a = 2; } a;"), JsValue::Number(2.0));
    assert_eq!(eval("let x = 1; { let x = 2; } x"), JsValue::Number(1.0));
}

#[test]
fn test_temporal_dead_zone() {
    assert!(throws_error("x; let x = 1;", "ReferenceError"));
    assert!(throws_error("{ typeof y; let y; }", "ReferenceError"));
}

#[test]
fn test_const_assignment_throws() {
    assert!(throws_error("const c = 1; c = 2;", "TypeError"));
    assert!(throws_error("function f() { const c = 1; c++; } f()", "Assignment to constant variable."));
    assert_eq!(eval("const f = function g() { g = 1; return typeof g; }; f()"), s("function"));
}

#[test]
fn test_var_hoisting() {
    assert_eq!(eval("typeof v; var v = 1; v"), JsValue::Number(1.0));
    assert_eq!(eval("var r = f(); function f() { return 5; } r"), JsValue::Number(5.0));
}

#[test]
fn test_undeclared_reference_throws() {
    assert!(throws_error("missing + 1", "missing is not defined"));
}

#[test]
fn test_logical_and_nullish_operators() {
    assert_eq!(eval("null ?? 'd'"), s("d"));
    assert_eq!(eval("0 ?? 'd'"), JsValue::Number(0.0));
    assert_eq!(eval("0 || 'd'"), s("d"));
    assert_eq!(eval("1 && 'd'"), s("d"));
    assert_eq!(eval("let a = null; a ??= 4; a"), JsValue::Number(4.0));
}

#[test]
fn test_optional_chaining() {
    assert_eq!(eval("const o = null; o?.a.b.c"), JsValue::Undefined);
    assert_eq!(eval("const o = { a: { b: 2 } }; o?.a?.b"), JsValue::Number(2.0));
    assert_eq!(eval("const o = {}; o.f?.()"), JsValue::Undefined);
}

#[test]
fn test_update_expressions() {
    assert_eq!(eval("let i = 1; const a = i++; a * 10 + i"), JsValue::Number(12.0));
    assert_eq!(eval("let i = 1; const a = ++i; a * 10 + i"), JsValue::Number(22.0));
}

#[test]
fn test_bitwise_operators() {
    assert_eq!(eval("5 & 3"), JsValue::Number(1.0));
    assert_eq!(eval("-1 >>> 28"), JsValue::Number(15.0));
    assert_eq!(eval("1 << 31"), JsValue::Number(-2147483648.0));
}

#[test]
fn test_destructuring() {
    assert_eq!(eval("const [a, , b = 5, ...rest] = [1, 2, undefined, 4, 6]; a + b + rest.length"), JsValue::Number(8.0));
    assert_eq!(eval("const { x, y: { z }, ...others } = { x: 1, y: { z: 2 }, p: 3, q: 4 }; x + z + Object.keys(others).length"), JsValue::Number(5.0));
}

#[test]
fn test_spread() {
    assert_eq!(eval("Math_max = (...xs) => xs.length; Math_max(...[1, 2], 3)"), JsValue::Number(3.0));
    assert_eq!(eval("[...'abc'].join('-')"), s("a-b-c"));
    assert_eq!(eval("const o = { ...{ a: 1 }, b: 2 }; o.a + o.b"), JsValue::Number(3.0));
}

#[test]
fn test_with_statement() {
    assert_eq!(
        eval("var obj = { a: 1, b: 2 }; with (obj) { a = 3; b = 4; } obj.a + obj.b"),
        JsValue::Number(7.0)
    );
    assert_eq!(
        eval("var obj = { a: 1, b: 2 }; with (obj) { a = 3; b = 4; } typeof a"),
        s("undefined")
    );
}

#[test]
fn test_in_and_instanceof() {
    assert_eq!(eval("'a' in { a: 1 }"), JsValue::Boolean(true));
    assert_eq!(eval("[] instanceof Array"), JsValue::Boolean(true));
    assert_eq!(eval("[] instanceof Object"), JsValue::Boolean(true));
    assert!(throws_error("'a' in 1", "TypeError"));
}

#[test]
fn test_delete() {
    assert_eq!(eval("const o = { a: 1 }; delete o.a; 'a' in o"), JsValue::Boolean(false));
    assert_eq!(eval("const o = null; delete o?.a"), JsValue::Boolean(true));
}
