//! Object model: property attributes, prototypes and Object built-ins

use super::{eval, s, throws_error};
use stepjs::JsValue;

#[test]
fn test_property_key_order() {
    assert_eq!(
        eval("const o = { b: 1, 2: 1, a: 1, 1: 1, [Symbol('s')]: 1 }; Object.keys(o).join()"),
        s("1,2,b,a")
    );
    assert_eq!(eval("Object.getOwnPropertyNames([5, 6]).join()"), s("0,1,length"));
}

#[test]
fn test_non_writable_property() {
    assert_eq!(
        eval("const o = {}; Object.defineProperty(o, 'x', { value: 1 }); o.x = 2; o.x"),
        JsValue::Number(1.0)
    );
    assert!(throws_error(
        "'use strict'; const o = {}; Object.defineProperty(o, 'x', { value: 1 }); o.x = 2;",
        "TypeError"
    ));
}

#[test]
fn test_define_property_defaults_are_false() {
    assert_eq!(
        eval(
            r#"
            const o = {};
            Object.defineProperty(o, 'x', { value: 1 });
            const d = Object.getOwnPropertyDescriptor(o, 'x');
            [d.value, d.writable, d.enumerable, d.configurable].join()
            "#
        ),
        s("1,false,false,false")
    );
}

#[test]
fn test_non_configurable_cannot_be_redefined_or_deleted() {
    assert!(throws_error(
        "const o = {}; Object.defineProperty(o, 'x', { value: 1 }); Object.defineProperty(o, 'x', { value: 2 });",
        "TypeError"
    ));
    assert_eq!(
        eval("const o = {}; Object.defineProperty(o, 'x', { value: 1 }); delete o.x"),
        JsValue::Boolean(false)
    );
    assert_eq!(
        eval("const o = {}; Object.defineProperty(o, 'x', { value: 1 }); Object.defineProperty(o, 'x', { value: 1 }); o.x"),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_accessor_descriptor() {
    assert_eq!(
        eval(
            r#"
            const o = {};
            let stored = 0;
            Object.defineProperty(o, 'v', { get() { return stored + 1; }, set(x) { stored = x; }, enumerable: true });
            o.v = 10;
            const d = Object.getOwnPropertyDescriptor(o, 'v');
            [o.v, typeof d.get, 'value' in d, Object.keys(o).join()].join()
            "#
        ),
        s("11,function,false,v")
    );
    assert!(throws_error(
        "Object.defineProperty({}, 'x', { value: 1, get() {} })",
        "TypeError"
    ));
}

#[test]
fn test_freeze() {
    assert_eq!(
        eval("const o = Object.freeze({ a: 1 }); o.a = 2; o.b = 3; [o.a, o.b, Object.isFrozen(o), Object.isExtensible(o)].join()"),
        s("1,,true,false")
    );
    assert!(throws_error("'use strict'; const o = Object.freeze({ a: 1 }); o.a = 2;", "TypeError"));
}

#[test]
fn test_prevent_extensions() {
    assert_eq!(
        eval("const o = Object.preventExtensions({ a: 1 }); o.b = 1; o.a = 5; [o.a, 'b' in o].join()"),
        s("5,false")
    );
}

#[test]
fn test_prototype_chain() {
    assert_eq!(
        eval("const base = { greet() { return 'hi ' + this.name; } }; const o = Object.create(base); o.name = 'x'; o.greet()"),
        s("hi x")
    );
    assert_eq!(eval("Object.getPrototypeOf({}) === Object.prototype"), JsValue::Boolean(true));
    assert_eq!(eval("Object.getPrototypeOf(Object.create(null))"), JsValue::Null);
    assert_eq!(eval("const p = {}; const o = Object.create(p); p.isPrototypeOf(o)"), JsValue::Boolean(true));
}

#[test]
fn test_prototype_cycle_rejected() {
    assert!(throws_error(
        "const a = {}; const b = Object.create(a); Object.setPrototypeOf(a, b);",
        "TypeError"
    ));
    assert_eq!(
        eval("const a = {}; try { Object.setPrototypeOf(a, a); } catch (e) {} Object.getPrototypeOf(a) === Object.prototype"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_set_through_inherited_setter() {
    assert_eq!(
        eval("let seen; const proto = { set x(v) { seen = v; } }; const o = Object.create(proto); o.x = 3; [seen, o.hasOwnProperty('x')].join()"),
        s("3,false")
    );
}

#[test]
fn test_inherited_readonly_blocks_assignment() {
    assert_eq!(
        eval("const proto = Object.freeze({ x: 1 }); const o = Object.create(proto); o.x = 2; [o.x, o.hasOwnProperty('x')].join()"),
        s("1,false")
    );
}

#[test]
fn test_to_string_tags() {
    assert_eq!(eval("Object.prototype.toString.call([])"), s("[object Array]"));
    assert_eq!(eval("Object.prototype.toString.call(null)"), s("[object Null]"));
    assert_eq!(eval("Object.prototype.toString.call(undefined)"), s("[object Undefined]"));
    assert_eq!(eval("Object.prototype.toString.call(function () {})"), s("[object Function]"));
    assert_eq!(eval("Object.prototype.toString.call(new Map())"), s("[object Map]"));
    assert_eq!(eval("Object.prototype.toString.call({ [Symbol.toStringTag]: 'Custom' })"), s("[object Custom]"));
}

#[test]
fn test_keys_values_entries() {
    assert_eq!(eval("Object.values({ a: 1, b: 2 }).join()"), s("1,2"));
    assert_eq!(eval("Object.entries({ a: 1, b: 2 }).map(e => e.join('=')).join('&')"), s("a=1&b=2"));
}

#[test]
fn test_assign_invokes_getters_and_setters() {
    assert_eq!(
        eval("let log = ''; const target = { set a(v) { log += 'set' + v; } }; Object.assign(target, { get a() { return 1; } }, null, { b: 2 }); log + target.b"),
        s("set12")
    );
}

#[test]
fn test_value_of_and_to_primitive_order() {
    assert_eq!(eval("const o = { valueOf() { return 5; }, toString() { return 'str'; } }; [o + 1, `${o}`].join()"), s("6,str"));
    assert_eq!(
        eval("const o = { [Symbol.toPrimitive](hint) { return hint; } }; [`${o}`, o + '', +o].join()"),
        s("string,default,NaN")
    );
}

#[test]
fn test_computed_and_shorthand_properties() {
    assert_eq!(eval("const k = 'dyn'; const v = 1; const o = { [k + 'amic']: 2, v }; o.dynamic + o.v"), JsValue::Number(3.0));
}

#[test]
fn test_property_is_enumerable() {
    assert_eq!(
        eval("const o = { a: 1 }; [o.propertyIsEnumerable('a'), [].propertyIsEnumerable('length')].join()"),
        s("true,false")
    );
}
