//! Number built-in methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::object::{JsObject, ObjectKind, Property, PropertyKey};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue, number_to_string};

const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

/// Initialize Number.prototype and the Number constructor
pub fn init_number(realm: &mut Realm) {
    let proto = realm.intrinsics.number_prototype.cheap_clone();

    realm.register_method(&proto, "toFixed", number_to_fixed, 1);
    realm.register_method(&proto, "toString", number_to_string_method, 1);
    realm.register_method(&proto, "valueOf", number_value_of, 0);

    let constructor = realm.native_constructor("Number", number_constructor_fn, 1, &proto);
    realm.register_method(&constructor, "isNaN", number_is_nan, 1);
    realm.register_method(&constructor, "isFinite", number_is_finite, 1);
    realm.register_method(&constructor, "isInteger", number_is_integer, 1);
    realm.register_method(&constructor, "isSafeInteger", number_is_safe_integer, 1);

    let constants = [
        ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
        ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
        ("EPSILON", f64::EPSILON),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ];
    for (name, value) in constants {
        constructor
            .borrow_mut()
            .insert_property(PropertyKey::from(name), Property::frozen(JsValue::Number(value)));
    }

    realm.define_global("Number", JsValue::Object(constructor));
}

/// Number(value) converts to a primitive; `new Number(value)` creates a
/// wrapper object
pub fn number_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = match args.first() {
        Some(value) => interp.to_number(value)?,
        None => 0.0,
    };
    if interp.new_target().is_none() {
        return Ok(JsValue::Number(n));
    }
    let fallback = interp.realm.intrinsics.number_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    Ok(JsValue::Object(JsObject::new(ObjectKind::Number(n), Some(proto)).into_ref()))
}

/// thisNumberValue
fn get_number_value(this: &JsValue, method: &str) -> Result<f64, JsError> {
    match this {
        JsValue::Number(n) => Ok(*n),
        JsValue::Object(obj) => match obj.borrow().kind {
            ObjectKind::Number(n) => Ok(n),
            _ => Err(incompatible_receiver(method)),
        },
        _ => Err(incompatible_receiver(method)),
    }
}

pub fn number_value_of(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    get_number_value(&this, "Number.prototype.valueOf").map(JsValue::Number)
}

// Number.isNaN - stricter, no type coercion
pub fn number_is_nan(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(matches!(args.first(), Some(JsValue::Number(n)) if n.is_nan())))
}

// Number.isFinite - stricter, no type coercion
pub fn number_is_finite(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(matches!(args.first(), Some(JsValue::Number(n)) if n.is_finite())))
}

pub fn number_is_integer(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(
        matches!(args.first(), Some(JsValue::Number(n)) if n.is_finite() && n.trunc() == *n),
    ))
}

pub fn number_is_safe_integer(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(matches!(
        args.first(),
        Some(JsValue::Number(n)) if n.is_finite() && n.trunc() == *n && n.abs() <= MAX_SAFE_INTEGER
    )))
}

// Number.prototype.toFixed
pub fn number_to_fixed(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = get_number_value(&this, "Number.prototype.toFixed")?;
    let digits = interp.to_integer_or_infinity(&arg(args, 0))?;
    if !(0.0..=100.0).contains(&digits) {
        return Err(JsError::range_error("toFixed() digits argument must be between 0 and 100"));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(JsValue::from(number_to_string(n)));
    }
    // -0 is not below zero, so it prints without a sign
    let sign = if n < 0.0 { "-" } else { "" };
    Ok(JsValue::from(format!("{}{}", sign, fixed_digits(n.abs(), digits as usize))))
}

/// Every f64 below 1e21 has an exact decimal expansion within this many places
const EXACT_FRACTION_DIGITS: usize = 1100;

/// `x` (finite, non-negative) with `digits` fractional places, a tie rounding
/// to the larger value
fn fixed_digits(x: f64, digits: usize) -> String {
    let exact = format!("{:.prec$}", x, prec = EXACT_FRACTION_DIGITS);
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> = int_part.bytes().chain(frac_part.bytes().take(digits)).collect();

    if frac_part.as_bytes().get(digits).is_some_and(|d| *d >= b'5') {
        let mut carry = true;
        for d in kept.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, b'1');
        }
    }

    let int_len = kept.len().saturating_sub(digits);
    let (int_digits, frac_digits) = kept.split_at_checked(int_len).unwrap_or((kept.as_slice(), &[]));
    let mut out = String::from_utf8_lossy(int_digits).into_owned();
    if digits > 0 {
        out.push('.');
        out.push_str(&String::from_utf8_lossy(frac_digits));
    }
    out
}

// Number.prototype.toString
pub fn number_to_string_method(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let n = get_number_value(&this, "Number.prototype.toString")?;
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        radix => interp.to_integer_or_infinity(&radix)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(JsError::range_error("toString() radix must be between 2 and 36"));
    }
    if radix == 10.0 || !n.is_finite() {
        return Ok(JsValue::from(number_to_string(n)));
    }
    Ok(JsValue::from(to_radix_string(n, radix as u32)))
}

/// Integer part in `radix`, then up to 52 fractional digits
fn to_radix_string(n: f64, radix: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let digit = |d: u32| DIGITS.get(d as usize).map(|&c| c as char).unwrap_or('0');

    let negative = n < 0.0;
    let value = n.abs();
    let mut int_part = value.trunc();
    let mut frac_part = value - int_part;

    let mut int_digits = Vec::new();
    if int_part == 0.0 {
        int_digits.push('0');
    }
    while int_part >= 1.0 {
        let d = (int_part % f64::from(radix)) as u32;
        int_digits.push(digit(d));
        int_part = (int_part / f64::from(radix)).trunc();
    }
    int_digits.reverse();

    let mut result = String::new();
    if negative {
        result.push('-');
    }
    result.extend(int_digits);
    if frac_part > 0.0 {
        result.push('.');
        let mut count = 0;
        while frac_part > 0.0 && count < 52 {
            frac_part *= f64::from(radix);
            let d = frac_part.trunc() as u32;
            result.push(digit(d));
            frac_part -= f64::from(d);
            count += 1;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radix_conversion() {
        assert_eq!(to_radix_string(255.0, 16), "ff");
        assert_eq!(to_radix_string(-10.0, 2), "-1010");
        assert_eq!(to_radix_string(0.5, 2), "0.1");
        assert_eq!(to_radix_string(0.0, 36), "0");
    }

    #[test]
    fn test_fixed_digits_rounds_ties_up() {
        assert_eq!(fixed_digits(2.5, 0), "3");
        assert_eq!(fixed_digits(0.5, 0), "1");
        assert_eq!(fixed_digits(1.005, 2), "1.00");
        assert_eq!(fixed_digits(9.96, 1), "10.0");
        assert_eq!(fixed_digits(0.0, 2), "0.00");
        assert_eq!(fixed_digits(1.45, 1), "1.4");
    }
}
