//! String, Number and global numeric functions

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_string_length_counts_code_units() {
    assert_eq!(eval("'héllo'.length"), JsValue::Number(5.0));
    assert_eq!(eval("'😀'.length"), JsValue::Number(2.0));
    assert_eq!(eval("[...'a😀'].length"), JsValue::Number(2.0));
}

#[test]
fn test_string_indexing() {
    assert_eq!(eval("'abc'[1]"), s("b"));
    assert_eq!(eval("'abc'.charAt(5)"), s(""));
    assert_eq!(eval("'abc'.charCodeAt(0)"), JsValue::Number(97.0));
    assert_eq!(eval("Number.isNaN('abc'.charCodeAt(9))"), JsValue::Boolean(true));
}

#[test]
fn test_string_search() {
    assert_eq!(eval("'hello world'.indexOf('o')"), JsValue::Number(4.0));
    assert_eq!(eval("'hello world'.indexOf('o', 5)"), JsValue::Number(7.0));
    assert_eq!(eval("'hello'.includes('ell')"), JsValue::Boolean(true));
    assert_eq!(eval("'hello'.startsWith('he') && 'hello'.endsWith('lo')"), JsValue::Boolean(true));
    assert_eq!(eval("'hello'.startsWith('l', 2)"), JsValue::Boolean(true));
}

#[test]
fn test_slice_and_substring() {
    assert_eq!(eval("'abcdef'.slice(1, -2)"), s("bcd"));
    assert_eq!(eval("'abcdef'.slice(-2)"), s("ef"));
    assert_eq!(eval("'abcdef'.substring(4, 1)"), s("bcd"));
    assert_eq!(eval("'abcdef'.substring(-3, 2)"), s("ab"));
}

#[test]
fn test_case_and_trim() {
    assert_eq!(eval("'MiXeD'.toLowerCase() + 'MiXeD'.toUpperCase()"), s("mixedMIXED"));
    assert_eq!(eval("'\\n\\t  padded \\u00a0'.trim()"), s("padded"));
}

#[test]
fn test_split() {
    assert_eq!(eval("'a,b,,c'.split(',').length"), JsValue::Number(4.0));
    assert_eq!(eval("'abc'.split('').join('-')"), s("a-b-c"));
    assert_eq!(eval("'a,b,c'.split(',', 2).join()"), s("a,b"));
    assert_eq!(eval("'abc'.split().length"), JsValue::Number(1.0));
}

#[test]
fn test_repeat_and_pad() {
    assert_eq!(eval("'ab'.repeat(3)"), s("ababab"));
    assert!(throws_error("'a'.repeat(Infinity)", "RangeError"));
    assert_eq!(eval("'5'.padStart(3, '0')"), s("005"));
    assert_eq!(eval("'abc'.padEnd(6, '12')"), s("abc121"));
    assert_eq!(eval("'abc'.padStart(2)"), s("abc"));
}

#[test]
fn test_concat_and_from_char_code() {
    assert_eq!(eval("'a'.concat(1, null)"), s("a1null"));
    assert_eq!(eval("String.fromCharCode(72, 105)"), s("Hi"));
}

#[test]
fn test_string_conversion_of_symbols() {
    assert_eq!(eval("String(Symbol('tag'))"), s("Symbol(tag)"));
    assert!(throws_error("'' + Symbol('tag')", "TypeError"));
}

#[test]
fn test_string_methods_on_wrapper() {
    assert_eq!(eval("const w = new String('abc'); [w.length, w[0], w.toUpperCase(), typeof w.valueOf()].join()"), s("3,a,ABC,string"));
}

#[test]
fn test_number_to_fixed() {
    assert_eq!(eval("(1.005).toFixed(2)"), s("1.00"));
    assert_eq!(eval("(123.456).toFixed(1)"), s("123.5"));
    assert_eq!(eval("(0).toFixed(2)"), s("0.00"));
    assert_eq!(eval("(2.5).toFixed(0)"), s("3"));
    assert_eq!(eval("(0.5).toFixed(0)"), s("1"));
    assert_eq!(eval("(-2.5).toFixed(0)"), s("-3"));
    assert_eq!(eval("(-0).toFixed(2)"), s("0.00"));
    assert_eq!(eval("(0.000001).toFixed(7)"), s("0.0000010"));
    assert!(throws_error("(1).toFixed(101)", "RangeError"));
}

#[test]
fn test_number_to_string_radix() {
    assert_eq!(eval("(255).toString(16)"), s("ff"));
    assert_eq!(eval("(-5).toString(2)"), s("-101"));
    assert_eq!(eval("(0.5).toString(2)"), s("0.1"));
    assert!(throws_error("(1).toString(1)", "RangeError"));
}

#[test]
fn test_number_statics() {
    assert_eq!(eval("Number.isInteger(5) && !Number.isInteger(5.5)"), JsValue::Boolean(true));
    assert_eq!(eval("Number.isSafeInteger(2 ** 53 - 1) && !Number.isSafeInteger(2 ** 53)"), JsValue::Boolean(true));
    assert_eq!(eval("Number.isFinite('5')"), JsValue::Boolean(false));
    assert_eq!(eval("isFinite('5')"), JsValue::Boolean(true));
    assert_eq!(eval("Number.MAX_SAFE_INTEGER"), JsValue::Number(9007199254740991.0));
    assert_eq!(eval("Number.EPSILON > 0 && Number.EPSILON < 1e-15"), JsValue::Boolean(true));
}

#[test]
fn test_parse_int() {
    assert_eq!(eval("parseInt('  42px')"), JsValue::Number(42.0));
    assert_eq!(eval("parseInt('-0x1F')"), JsValue::Number(-31.0));
    assert_eq!(eval("parseInt('101', 2)"), JsValue::Number(5.0));
    assert_eq!(eval("parseInt('z', 36)"), JsValue::Number(35.0));
    assert_eq!(eval("isNaN(parseInt('px'))"), JsValue::Boolean(true));
    assert_eq!(eval("isNaN(parseInt('1', 37))"), JsValue::Boolean(true));
}

#[test]
fn test_parse_float() {
    assert_eq!(eval("parseFloat('3.14abc')"), JsValue::Number(3.14));
    assert_eq!(eval("parseFloat('  -1e3')"), JsValue::Number(-1000.0));
    assert_eq!(eval("parseFloat('-Infinityx')"), JsValue::Number(f64::NEG_INFINITY));
    assert_eq!(eval("parseFloat('.5')"), JsValue::Number(0.5));
    assert_eq!(eval("isNaN(parseFloat('e5'))"), JsValue::Boolean(true));
}

#[test]
fn test_number_and_boolean_constructors() {
    assert_eq!(eval("Number(null) + Number(true) + Number([7])"), JsValue::Number(8.0));
    assert_eq!(eval("isNaN(Number(undefined)) && isNaN(Number({}))"), JsValue::Boolean(true));
    assert_eq!(eval("Boolean('') || Boolean(0) || Boolean(NaN)"), JsValue::Boolean(false));
    assert_eq!(eval("Boolean([]) && Boolean({}) && Boolean('0')"), JsValue::Boolean(true));
    assert_eq!(eval("new Boolean(true).toString()"), s("true"));
}
