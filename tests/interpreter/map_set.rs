//! Map and Set

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_map_basic_operations() {
    assert_eq!(
        eval("const m = new Map(); m.set('a', 1).set('b', 2); [m.get('a'), m.has('b'), m.has('c'), m.size].join()"),
        s("1,true,false,2")
    );
    assert_eq!(eval("const m = new Map([['a', 1]]); [m.delete('a'), m.delete('a'), m.size].join()"), s("true,false,0"));
}

#[test]
fn test_map_keys_use_same_value_zero() {
    assert_eq!(eval("const m = new Map(); m.set(0, 'zero'); m.get(-0)"), s("zero"));
    assert_eq!(eval("const m = new Map(); m.set(NaN, 'nan'); m.get(NaN)"), s("nan"));
    assert_eq!(eval("const m = new Map(); m.set(-0, 1); m.set(0, 2); m.size"), JsValue::Number(1.0));
    assert_eq!(eval("const m = new Map(); m.set('1', 'str'); m.get(1)"), JsValue::Undefined);
    assert_eq!(eval("const k = {}; const m = new Map([[k, 'obj']]); m.get(k) + m.has({})"), s("objfalse"));
}

#[test]
fn test_map_preserves_insertion_order() {
    assert_eq!(
        eval("const m = new Map([['z', 1], ['a', 2]]); m.set('z', 3); [...m.keys()].join() + ':' + [...m.values()].join()"),
        s("z,a:3,2")
    );
    assert_eq!(
        eval("const m = new Map([[1, 'a']]); m.delete(1); m.set(1, 'b'); m.set(2, 'c'); [...m].map(e => e.join('=')).join()"),
        s("1=b,2=c")
    );
}

#[test]
fn test_map_clear() {
    assert_eq!(eval("const map = new Map([[1, 2]]); map.clear(); Array.from(map).length === 0"), JsValue::Boolean(true));
}

#[test]
fn test_map_for_each_sees_live_updates() {
    assert_eq!(
        eval(
            r#"
            const m = new Map([[1, 'a'], [2, 'b']]);
            const seen = [];
            m.forEach((value, key, map) => {
                seen.push(key + value);
                if (key === 1) { map.delete(2); map.set(3, 'c'); }
            });
            seen.join()
            "#
        ),
        s("1a,3c")
    );
}

#[test]
fn test_map_iterator_survives_clear() {
    assert_eq!(
        eval("const m = new Map([[1, 1], [2, 2]]); const it = m.keys(); it.next(); m.clear(); m.set(9, 9); it.next().value"),
        JsValue::Number(9.0)
    );
}

#[test]
fn test_map_requires_new() {
    assert!(throws_error("Map()", "TypeError"));
    assert!(throws_error("new Map([1])", "TypeError"));
}

#[test]
fn test_map_entries_is_iterator() {
    assert_eq!(eval("Map.prototype.entries === Map.prototype[Symbol.iterator]"), JsValue::Boolean(true));
}

#[test]
fn test_set_basic_operations() {
    assert_eq!(
        eval("const st = new Set([1, 2, 2, 3]); st.add(4).add(1); [st.size, st.has(4), st.delete(2), st.has(2)].join()"),
        s("4,true,true,false")
    );
}

#[test]
fn test_set_normalizes_negative_zero() {
    assert_eq!(eval("const st = new Set([-0]); Object.is([...st][0], 0)"), JsValue::Boolean(true));
    assert_eq!(eval("new Set([0, -0, NaN, NaN]).size"), JsValue::Number(2.0));
}

#[test]
fn test_set_iteration() {
    assert_eq!(eval("[...new Set('hello')].join('')"), s("helo"));
    assert_eq!(eval("[...new Set([1, 2]).entries()].map(e => e.join('=')).join()"), s("1=1,2=2"));
    assert_eq!(eval("Set.prototype.keys === Set.prototype.values"), JsValue::Boolean(true));
    assert_eq!(
        eval("let sum = 0; new Set([1, 2, 3]).forEach(function (v) { sum += v * this.k; }, { k: 2 }); sum"),
        JsValue::Number(12.0)
    );
}

#[test]
fn test_size_getter_rejects_other_receivers() {
    assert!(throws_error(
        "Object.getOwnPropertyDescriptor(Map.prototype, 'size').get.call(new Set())",
        "TypeError"
    ));
}
