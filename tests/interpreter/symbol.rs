//! Symbols, the registry and well-known symbol protocols

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_symbols_are_unique() {
    assert_eq!(eval("Symbol('a') === Symbol('a')"), JsValue::Boolean(false));
    assert_eq!(eval("const a = Symbol('a'); a === a"), JsValue::Boolean(true));
}

#[test]
fn test_description() {
    assert_eq!(eval("Symbol('desc').description"), s("desc"));
    assert_eq!(eval("Symbol().description"), JsValue::Undefined);
    assert_eq!(eval("Symbol('x').toString()"), s("Symbol(x)"));
}

#[test]
fn test_registry() {
    assert_eq!(eval("Symbol.for('app') === Symbol.for('app')"), JsValue::Boolean(true));
    assert_eq!(eval("Symbol.keyFor(Symbol.for('app'))"), s("app"));
    assert_eq!(eval("Symbol.keyFor(Symbol('app'))"), JsValue::Undefined);
    assert!(throws_error("Symbol.keyFor('app')", "TypeError"));
}

#[test]
fn test_symbol_is_not_constructor() {
    assert!(throws_error("new Symbol()", "TypeError"));
}

#[test]
fn test_symbol_keyed_properties_are_hidden_from_keys() {
    assert_eq!(
        eval("const k = Symbol('k'); const o = { [k]: 1, a: 2 }; [o[k], Object.keys(o).join(), k in o].join()"),
        s("1,a,true")
    );
}

#[test]
fn test_symbol_to_number_throws() {
    assert!(throws_error("Symbol() + 1", "TypeError"));
}

#[test]
fn test_well_known_symbols_are_shared() {
    assert_eq!(eval("typeof Symbol.iterator === 'symbol' && Symbol.iterator === Symbol.iterator"), JsValue::Boolean(true));
    assert_eq!(eval("Symbol.iterator.description"), s("Symbol.iterator"));
}

#[test]
fn test_custom_iterator_protocol() {
    assert_eq!(
        eval(
            r#"
            const countdown = {
                from: 3,
                [Symbol.iterator]() {
                    let n = this.from;
                    return { next: () => n > 0 ? { value: n--, done: false } : { value: undefined, done: true } };
                },
            };
            [...countdown].join()
            "#
        ),
        s("3,2,1")
    );
}

#[test]
fn test_non_iterable_spread_throws() {
    assert!(throws_error("[...{}]", "TypeError"));
    assert!(throws_error("const [a] = 5;", "TypeError"));
}

#[test]
fn test_to_primitive_hook() {
    assert_eq!(
        eval("const money = { [Symbol.toPrimitive](hint) { return hint === 'number' ? 42 : 'forty-two'; } }; [money * 1, `${money}`].join()"),
        s("42,forty-two")
    );
    assert!(throws_error(
        "const bad = { [Symbol.toPrimitive]() { return {}; } }; bad + 1",
        "TypeError"
    ));
}

#[test]
fn test_symbol_wrapper() {
    assert_eq!(eval("const sym = Symbol('w'); Object(sym).valueOf() === sym"), JsValue::Boolean(true));
    assert_eq!(eval("typeof Object(Symbol())"), s("object"));
}
