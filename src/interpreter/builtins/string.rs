//! String built-in methods
//!
//! Indices are UTF-16 code units, as in the language.

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::iterator::create_string_iterator;
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::interpreter::ops::relative_index;
use crate::object::{JsObject, ObjectKind};
use crate::realm::Realm;
use crate::value::{CheapClone, JsString, JsValue, is_js_whitespace};

/// Initialize String.prototype and the String constructor
pub fn init_string(realm: &mut Realm) {
    let proto = realm.intrinsics.string_prototype.cheap_clone();

    // Character access
    realm.register_method(&proto, "charAt", string_char_at, 1);
    realm.register_method(&proto, "charCodeAt", string_char_code_at, 1);

    // Search methods
    realm.register_method(&proto, "indexOf", string_index_of, 1);
    realm.register_method(&proto, "includes", string_includes, 1);
    realm.register_method(&proto, "startsWith", string_starts_with, 1);
    realm.register_method(&proto, "endsWith", string_ends_with, 1);

    // Extraction methods
    realm.register_method(&proto, "slice", string_slice, 2);
    realm.register_method(&proto, "substring", string_substring, 2);

    // Transformation methods
    realm.register_method(&proto, "toLowerCase", string_to_lower_case, 0);
    realm.register_method(&proto, "toUpperCase", string_to_upper_case, 0);
    realm.register_method(&proto, "trim", string_trim, 0);
    realm.register_method(&proto, "split", string_split, 2);
    realm.register_method(&proto, "repeat", string_repeat, 1);
    realm.register_method(&proto, "padStart", string_pad_start, 2);
    realm.register_method(&proto, "padEnd", string_pad_end, 2);
    realm.register_method(&proto, "concat", string_concat, 1);

    // Primitive conversion
    realm.register_method(&proto, "valueOf", string_value_of, 0);
    realm.register_method(&proto, "toString", string_to_string, 0);
    let iterator = realm.symbols.iterator.cheap_clone();
    realm.register_symbol_method(&proto, &iterator, string_iterator, 0);

    let constructor = realm.native_constructor("String", string_constructor_fn, 1, &proto);
    realm.register_method(&constructor, "fromCharCode", string_from_char_code, 1);
    realm.define_global("String", JsValue::Object(constructor));
}

/// String(value) converts (symbols render descriptively); `new String`
/// creates a wrapper
pub fn string_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = match args.first() {
        None => JsString::from(""),
        Some(JsValue::Symbol(sym)) if interp.new_target().is_none() => JsString::from(sym.descriptive_string()),
        Some(value) => interp.to_string(value)?,
    };
    if interp.new_target().is_none() {
        return Ok(JsValue::String(text));
    }
    let fallback = interp.realm.intrinsics.string_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    Ok(JsValue::Object(JsObject::new(ObjectKind::String(text), Some(proto)).into_ref()))
}

/// thisStringValue
fn this_string_value(this: &JsValue, method: &str) -> Result<JsString, JsError> {
    match this {
        JsValue::String(s) => Ok(s.cheap_clone()),
        JsValue::Object(obj) => match &obj.borrow().kind {
            ObjectKind::String(s) => Ok(s.cheap_clone()),
            _ => Err(incompatible_receiver(method)),
        },
        _ => Err(incompatible_receiver(method)),
    }
}

/// RequireObjectCoercible(this) then ToString
fn coerce_this(interp: &mut Interpreter, this: &JsValue, method: &str) -> Result<JsString, JsError> {
    if this.is_null_or_undefined() {
        return Err(JsError::type_error(format!(
            "String.prototype.{} called on null or undefined",
            method
        )));
    }
    interp.to_string(this)
}

pub fn string_value_of(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    this_string_value(&this, "String.prototype.valueOf").map(JsValue::String)
}

pub fn string_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    this_string_value(&this, "String.prototype.toString").map(JsValue::String)
}

/// String.prototype[@@iterator]: iterates code points
pub fn string_iterator(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "[Symbol.iterator]")?;
    Ok(create_string_iterator(interp, text))
}

pub fn string_from_char_code(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut units = Vec::with_capacity(args.len());
    for value in args {
        units.push(interp.to_uint32(value)? as u16);
    }
    Ok(JsValue::from(String::from_utf16_lossy(&units)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Character access and search
// ═══════════════════════════════════════════════════════════════════════════════

pub fn string_char_at(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "charAt")?;
    let position = interp.to_integer_or_infinity(&arg(args, 0))?;
    if position < 0.0 {
        return Ok(JsValue::from(""));
    }
    let ch = text.char_at(position as usize).unwrap_or_else(|| JsString::from(""));
    Ok(JsValue::String(ch))
}

pub fn string_char_code_at(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "charCodeAt")?;
    let position = interp.to_integer_or_infinity(&arg(args, 0))?;
    if position < 0.0 {
        return Ok(JsValue::Number(f64::NAN));
    }
    let code = text
        .code_unit_at(position as usize)
        .map(f64::from)
        .unwrap_or(f64::NAN);
    Ok(JsValue::Number(code))
}

pub fn string_index_of(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "indexOf")?;
    let needle = interp.to_string(&arg(args, 0))?;
    let from = interp.to_integer_or_infinity(&arg(args, 1))?;
    let from = from.clamp(0.0, text.utf16_len() as f64) as usize;
    let index = text
        .index_of_utf16(needle.as_str(), from)
        .map(|i| i as f64)
        .unwrap_or(-1.0);
    Ok(JsValue::Number(index))
}

pub fn string_includes(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "includes")?;
    let needle = interp.to_string(&arg(args, 0))?;
    let from = interp.to_integer_or_infinity(&arg(args, 1))?;
    let from = from.clamp(0.0, text.utf16_len() as f64) as usize;
    Ok(JsValue::Boolean(text.index_of_utf16(needle.as_str(), from).is_some()))
}

pub fn string_starts_with(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "startsWith")?;
    let needle = interp.to_string(&arg(args, 0))?;
    let len = text.utf16_len();
    let start = interp.to_integer_or_infinity(&arg(args, 1))?.clamp(0.0, len as f64) as usize;
    let end = start + needle.utf16_len();
    Ok(JsValue::Boolean(end <= len && text.substring_utf16(start, end) == needle))
}

pub fn string_ends_with(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "endsWith")?;
    let needle = interp.to_string(&arg(args, 0))?;
    let len = text.utf16_len();
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        end => interp.to_integer_or_infinity(&end)?.clamp(0.0, len as f64) as usize,
    };
    let Some(start) = end.checked_sub(needle.utf16_len()) else {
        return Ok(JsValue::Boolean(false));
    };
    Ok(JsValue::Boolean(text.substring_utf16(start, end) == needle))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Extraction
// ═══════════════════════════════════════════════════════════════════════════════

pub fn string_slice(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "slice")?;
    let len = text.utf16_len() as u64;
    let start = relative_index(interp.to_integer_or_infinity(&arg(args, 0))?, len);
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        end => relative_index(interp.to_integer_or_infinity(&end)?, len),
    };
    Ok(JsValue::String(text.substring_utf16(start as usize, end as usize)))
}

pub fn string_substring(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "substring")?;
    let len = text.utf16_len() as f64;
    let start = interp.to_integer_or_infinity(&arg(args, 0))?.clamp(0.0, len) as usize;
    let end = match arg(args, 1) {
        JsValue::Undefined => len as usize,
        end => interp.to_integer_or_infinity(&end)?.clamp(0.0, len) as usize,
    };
    Ok(JsValue::String(text.substring_utf16(start.min(end), start.max(end))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Transformation
// ═══════════════════════════════════════════════════════════════════════════════

pub fn string_to_lower_case(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "toLowerCase")?;
    Ok(JsValue::from(text.as_str().to_lowercase()))
}

pub fn string_to_upper_case(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "toUpperCase")?;
    Ok(JsValue::from(text.as_str().to_uppercase()))
}

pub fn string_trim(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "trim")?;
    Ok(JsValue::from(text.as_str().trim_matches(is_js_whitespace)))
}

/// split with a string separator and optional limit
pub fn string_split(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "split")?;
    let limit = match arg(args, 1) {
        JsValue::Undefined => u32::MAX,
        limit => interp.to_uint32(&limit)?,
    } as usize;
    let separator = arg(args, 0);
    if separator.is_undefined() {
        let whole = vec![JsValue::String(text)];
        return Ok(JsValue::Object(interp.create_array(whole.into_iter().take(limit).collect())));
    }
    let separator = interp.to_string(&separator)?;

    let parts: Vec<JsValue> = if separator.is_empty() {
        (0..text.utf16_len())
            .filter_map(|i| text.char_at(i))
            .map(JsValue::String)
            .take(limit)
            .collect()
    } else {
        text.as_str()
            .split(separator.as_str())
            .map(JsValue::from)
            .take(limit)
            .collect()
    };
    Ok(JsValue::Object(interp.create_array(parts)))
}

pub fn string_repeat(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, "repeat")?;
    let count = interp.to_integer_or_infinity(&arg(args, 0))?;
    if count < 0.0 || count.is_infinite() {
        return Err(JsError::range_error(format!(
            "Invalid count value: {}",
            crate::value::number_to_string(count)
        )));
    }
    if text.is_empty() || count == 0.0 {
        return Ok(JsValue::from(""));
    }
    if (text.as_str().len() as f64) * count > crate::value::MAX_STRING_LENGTH as f64 {
        return Err(JsError::range_error("Invalid string length"));
    }
    Ok(JsValue::from(text.as_str().repeat(count as usize)))
}

pub fn string_pad_start(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    pad(interp, this, args, true)
}

pub fn string_pad_end(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    pad(interp, this, args, false)
}

fn pad(interp: &mut Interpreter, this: JsValue, args: &[JsValue], at_start: bool) -> Result<JsValue, JsError> {
    let text = coerce_this(interp, &this, if at_start { "padStart" } else { "padEnd" })?;
    let target = interp.to_length(&arg(args, 0))? as usize;
    let filler = match arg(args, 1) {
        JsValue::Undefined => JsString::from(" "),
        filler => interp.to_string(&filler)?,
    };
    let len = text.utf16_len();
    if target <= len || filler.is_empty() {
        return Ok(JsValue::String(text));
    }
    let fill_len = target - len;
    let filler_units: Vec<u16> = filler.as_str().encode_utf16().collect();
    let padding: Vec<u16> = filler_units.iter().copied().cycle().take(fill_len).collect();
    let padding = String::from_utf16_lossy(&padding);
    let result = if at_start {
        format!("{}{}", padding, text)
    } else {
        format!("{}{}", text, padding)
    };
    Ok(JsValue::from(result))
}

pub fn string_concat(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut text = coerce_this(interp, &this, "concat")?;
    for value in args {
        let part = interp.to_string(value)?;
        text = text.concat(&part);
    }
    Ok(JsValue::String(text))
}
