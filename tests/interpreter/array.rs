//! Array exotic objects and Array built-ins

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_length_tracks_highest_index() {
    assert_eq!(eval("const a = []; a[4] = 1; a.length"), JsValue::Number(5.0));
    assert_eq!(eval("const a = [1, 2, 3]; a.length = 1; a.join()"), s("1"));
    assert_eq!(eval("const a = [1, 2, 3]; a.length = 1; a[2]"), JsValue::Undefined);
}

#[test]
fn test_invalid_length_is_range_error() {
    assert!(throws_error("const a = []; a.length = -1;", "RangeError"));
    assert!(throws_error("new Array(1.5)", "RangeError"));
}

#[test]
fn test_array_constructor() {
    assert_eq!(eval("new Array(3).length"), JsValue::Number(3.0));
    assert_eq!(eval("Array(1, 2).join()"), s("1,2"));
    assert_eq!(eval("Array.of(7).length"), JsValue::Number(1.0));
}

#[test]
fn test_holes() {
    assert_eq!(eval("const a = [1, , 3]; [a.length, 1 in a].join()"), s("3,false"));
    assert_eq!(eval("[1, , 3].join('-')"), s("1--3"));
    assert_eq!(eval("[null, undefined, 1].join()"), s(",,1"));
}

#[test]
fn test_push_pop_shift() {
    assert_eq!(eval("const a = [1]; const n = a.push(2, 3); [n, a.pop(), a.shift(), a.join()].join()"), s("3,3,1,2"));
    assert_eq!(eval("[].pop()"), JsValue::Undefined);
}

#[test]
fn test_slice_and_concat() {
    assert_eq!(eval("[1, 2, 3, 4].slice(1, -1).join()"), s("2,3"));
    assert_eq!(eval("[1, 2, 3].slice(-2).join()"), s("2,3"));
    assert_eq!(eval("[1].concat([2, 3], 4, [[5]]).length"), JsValue::Number(5.0));
}

#[test]
fn test_reverse() {
    assert_eq!(eval("const a = [1, 2, 3]; a.reverse() === a && a.join() === '3,2,1'"), JsValue::Boolean(true));
}

#[test]
fn test_index_of_and_includes() {
    assert_eq!(eval("[1, 2, NaN].indexOf(NaN)"), JsValue::Number(-1.0));
    assert_eq!(eval("[1, 2, NaN].includes(NaN)"), JsValue::Boolean(true));
    assert_eq!(eval("['a', 'b', 'a'].indexOf('a', 1)"), JsValue::Number(2.0));
}

#[test]
fn test_higher_order_methods() {
    assert_eq!(eval("[1, 2, 3].map((x, i) => x * i).join()"), s("0,2,6"));
    assert_eq!(eval("[1, 2, 3, 4].filter(x => x % 2 === 0).join()"), s("2,4"));
    assert_eq!(eval("[1, 2, 3].reduce((acc, x) => acc + x)"), JsValue::Number(6.0));
    assert_eq!(eval("[1, 2, 3].reduce((acc, x) => acc + x, 10)"), JsValue::Number(16.0));
    assert_eq!(eval("[5, 8, 12].find(x => x > 6)"), JsValue::Number(8.0));
    assert_eq!(eval("[1, 2].some(x => x > 1) && ![1, 2].every(x => x > 1)"), JsValue::Boolean(true));
    assert_eq!(eval("let sum = 0; [1, 2, 3].forEach(x => { sum += x; }); sum"), JsValue::Number(6.0));
}

#[test]
fn test_map_passes_this_arg() {
    assert_eq!(eval("[1, 2].map(function (x) { return x * this.k; }, { k: 3 }).join()"), s("3,6"));
}

#[test]
fn test_reduce_empty_without_initial_throws() {
    assert!(throws_error("[].reduce((a, b) => a + b)", "TypeError"));
}

#[test]
fn test_callback_must_be_callable() {
    assert!(throws_error("[1].map(42)", "is not a function"));
}

#[test]
fn test_array_from() {
    assert_eq!(eval("Array.from('abc').join('|')"), s("a|b|c"));
    assert_eq!(eval("Array.from({ length: 2, 0: 'x', 1: 'y' }).join()"), s("x,y"));
    assert_eq!(eval("Array.from([1, 2], x => x * 10).join()"), s("10,20"));
    assert_eq!(eval("Array.from(new Set([1, 1, 2])).length"), JsValue::Number(2.0));
}

#[test]
fn test_is_array() {
    assert_eq!(eval("Array.isArray([]) && !Array.isArray({ length: 0 })"), JsValue::Boolean(true));
}

#[test]
fn test_iterators() {
    assert_eq!(eval("[...['a', 'b'].keys()].join()"), s("0,1"));
    assert_eq!(eval("[...['a', 'b'].entries()].map(e => e.join(':')).join()"), s("0:a,1:b"));
    assert_eq!(eval("const a = [1]; const it = a.values(); a.push(2); [...it].join()"), s("1,2"));
}

#[test]
fn test_nested_to_string() {
    assert_eq!(eval("String([1, [2, [3]]])"), s("1,2,3"));
}
