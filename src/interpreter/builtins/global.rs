//! Global value properties and functions (globalThis, NaN, parseInt, ...)

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::arg;
use crate::object::{Property, PropertyKey};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue, is_js_whitespace};

/// Register the global value properties and functions
pub fn init_globals(realm: &mut Realm) {
    let global = realm.global_object.cheap_clone();
    {
        let mut g = global.borrow_mut();
        g.set_hidden("globalThis", JsValue::Object(global.cheap_clone()));
        let constants = [
            ("NaN", JsValue::Number(f64::NAN)),
            ("Infinity", JsValue::Number(f64::INFINITY)),
            ("undefined", JsValue::Undefined),
        ];
        for (name, value) in constants {
            g.insert_property(PropertyKey::from(name), Property::frozen(value));
        }
    }

    let functions = [
        ("parseInt", global_parse_int as crate::object::NativeFn, 2),
        ("parseFloat", global_parse_float, 1),
        ("isNaN", global_is_nan, 1),
        ("isFinite", global_is_finite, 1),
    ];
    for (name, func, arity) in functions {
        realm.register_method(&global, name, func, arity);
    }
}

/// parseInt(string, radix)
pub fn global_parse_int(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let input = interp.to_string(&arg(args, 0))?;
    let mut radix = interp.to_int32(&arg(args, 1))?;

    let mut text = input.as_str().trim_start_matches(is_js_whitespace);
    let mut sign = 1.0;
    if let Some(rest) = text.strip_prefix('-') {
        sign = -1.0;
        text = rest;
    } else if let Some(rest) = text.strip_prefix('+') {
        text = rest;
    }

    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return Ok(JsValue::Number(f64::NAN));
        }
        if radix != 16 {
            strip_prefix = false;
        }
    } else {
        radix = 10;
    }
    if strip_prefix && let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        text = rest;
        radix = 16;
    }

    let mut result: Option<f64> = None;
    for ch in text.chars() {
        let Some(digit) = ch.to_digit(radix as u32) else {
            break;
        };
        result = Some(result.unwrap_or(0.0) * f64::from(radix) + f64::from(digit));
    }
    Ok(JsValue::Number(result.map(|n| sign * n).unwrap_or(f64::NAN)))
}

/// parseFloat(string): the longest prefix that is a decimal literal
pub fn global_parse_float(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let input = interp.to_string(&arg(args, 0))?;
    let text = input.as_str().trim_start_matches(is_js_whitespace);

    for (prefix, value) in [("Infinity", f64::INFINITY), ("+Infinity", f64::INFINITY), ("-Infinity", f64::NEG_INFINITY)] {
        if text.starts_with(prefix) {
            return Ok(JsValue::Number(value));
        }
    }

    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let mut last_valid = 0;
    let bytes = text.as_bytes();
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => last_valid = end + 1,
            b'+' | b'-' if end == 0 => {}
            b'+' | b'-' if matches!(bytes.get(end.wrapping_sub(1)), Some(b'e' | b'E')) => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if !seen_exp && last_valid > 0 => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    let number = text
        .get(..last_valid)
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .unwrap_or(f64::NAN);
    Ok(JsValue::Number(number))
}

/// isNaN(value) with coercion
pub fn global_is_nan(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
}

/// isFinite(value) with coercion
pub fn global_is_finite(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
}
