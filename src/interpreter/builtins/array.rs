//! Array built-in methods
//!
//! The prototype methods are generic: they work on any array-like receiver
//! through [[Get]]/[[Set]] and `length`.

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::arg;
use crate::interpreter::builtins::iterator::create_array_iterator;
use crate::interpreter::builtins::object::object_to_string;
use crate::interpreter::ops::{index_key, relative_index};
use crate::object::{
    ArrayState, IterationKind, JsObject, JsObjectRef, ObjectKind, PropertyKey, exact_u32, has_property,
};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue, MAX_STRING_LENGTH};

/// Initialize Array.prototype and the Array constructor
pub fn init_array(realm: &mut Realm) {
    let proto = realm.intrinsics.array_prototype.cheap_clone();

    // Mutating methods
    realm.register_method(&proto, "push", array_push, 1);
    realm.register_method(&proto, "pop", array_pop, 0);
    realm.register_method(&proto, "shift", array_shift, 0);
    realm.register_method(&proto, "reverse", array_reverse, 0);

    // Accessor methods
    realm.register_method(&proto, "concat", array_concat, 1);
    realm.register_method(&proto, "slice", array_slice, 2);
    realm.register_method(&proto, "join", array_join, 1);
    realm.register_method(&proto, "toString", array_to_string, 0);
    realm.register_method(&proto, "indexOf", array_index_of, 1);
    realm.register_method(&proto, "includes", array_includes, 1);

    // Iteration methods
    realm.register_method(&proto, "forEach", array_foreach, 1);
    realm.register_method(&proto, "map", array_map, 1);
    realm.register_method(&proto, "filter", array_filter, 1);
    realm.register_method(&proto, "reduce", array_reduce, 1);
    realm.register_method(&proto, "find", array_find, 1);
    realm.register_method(&proto, "some", array_some, 1);
    realm.register_method(&proto, "every", array_every, 1);

    // Iterator methods; @@iterator is the same function object as `values`
    realm.register_method(&proto, "keys", array_keys, 0);
    realm.register_method(&proto, "values", array_values, 0);
    realm.register_method(&proto, "entries", array_entries, 0);
    let values = proto.borrow().get_own_data(&PropertyKey::from("values"));
    if let Some(values) = values {
        let key = PropertyKey::Symbol(realm.symbols.iterator.cheap_clone());
        proto.borrow_mut().set_hidden(key, values);
    }

    let constructor = realm.native_constructor("Array", array_constructor_fn, 1, &proto);
    realm.register_method(&constructor, "isArray", array_is_array, 1);
    realm.register_method(&constructor, "of", array_of, 0);
    realm.register_method(&constructor, "from", array_from, 1);
    realm.define_global("Array", JsValue::Object(constructor));
}

/// Array(len) or Array(...items), with or without `new`
pub fn array_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let fallback = interp.realm.intrinsics.array_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    let mut array = JsObject::new(
        ObjectKind::Array(ArrayState {
            length: 0,
            length_writable: true,
        }),
        Some(proto),
    );
    match args {
        [JsValue::Number(n)] => {
            let Some(length) = exact_u32(*n) else {
                return Err(JsError::range_error("Invalid array length"));
            };
            array.grow_array_length(length);
        }
        _ => {
            for value in args {
                array.push_element(value.cheap_clone());
            }
        }
    }
    Ok(JsValue::Object(array.into_ref()))
}

pub fn array_is_array(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let is_array = match arg(args, 0) {
        JsValue::Object(obj) => obj.borrow().is_array(),
        _ => false,
    };
    Ok(JsValue::Boolean(is_array))
}

pub fn array_of(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Object(interp.create_array(args.to_vec())))
}

/// Array.from(items, mapFn, thisArg): iterables first, array-likes otherwise
pub fn array_from(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let items = arg(args, 0);
    let map_fn = arg(args, 1);
    if !map_fn.is_undefined() && !map_fn.is_callable() {
        return Err(JsError::type_error(format!(
            "{} is not a function",
            interp.display_value(&map_fn)
        )));
    }
    if items.is_null_or_undefined() {
        return Err(JsError::type_error(format!(
            "{} is not iterable",
            interp.display_value(&items)
        )));
    }

    let iterator_key = PropertyKey::Symbol(interp.realm.symbols.iterator.cheap_clone());
    let values = if interp.get_method(&items, &iterator_key)?.is_some() {
        interp.iterate_to_list(&items)?
    } else {
        let array_like = interp.to_object(&items)?;
        interp.create_list_from_array_like(&JsValue::Object(array_like))?
    };

    let values = if map_fn.is_undefined() {
        values
    } else {
        let this_arg = arg(args, 2);
        let mut mapped = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let index = JsValue::Number(index as f64);
            mapped.push(interp.call_function(&map_fn, this_arg.cheap_clone(), &[value, index])?);
        }
        mapped
    };
    Ok(JsValue::Object(interp.create_array(values)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Mutating methods
// ═══════════════════════════════════════════════════════════════════════════════

pub fn array_push(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let mut length = interp.length_of_array_like(&obj)?;
    for value in args {
        interp.set(&obj, index_key(length), value.cheap_clone())?;
        length += 1;
    }
    let length = JsValue::Number(length as f64);
    interp.set(&obj, "length", length.cheap_clone())?;
    Ok(length)
}

pub fn array_pop(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    if length == 0 {
        interp.set(&obj, "length", JsValue::Number(0.0))?;
        return Ok(JsValue::Undefined);
    }
    let key = index_key(length - 1);
    let value = interp.get(&obj, &key)?;
    interp.delete_property_or_throw(&obj, &key)?;
    interp.set(&obj, "length", JsValue::Number((length - 1) as f64))?;
    Ok(value)
}

pub fn array_shift(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    if length == 0 {
        interp.set(&obj, "length", JsValue::Number(0.0))?;
        return Ok(JsValue::Undefined);
    }
    let first = interp.get(&obj, &index_key(0))?;
    for index in 1..length {
        interp.charge_native_step()?;
        let from = index_key(index);
        let to = index_key(index - 1);
        if has_property(&obj, &from) {
            let value = interp.get(&obj, &from)?;
            interp.set(&obj, to, value)?;
        } else {
            interp.delete_property_or_throw(&obj, &to)?;
        }
    }
    interp.delete_property_or_throw(&obj, &index_key(length - 1))?;
    interp.set(&obj, "length", JsValue::Number((length - 1) as f64))?;
    Ok(first)
}

pub fn array_reverse(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    let mut lower = 0;
    while length > 0 && lower < length / 2 {
        interp.charge_native_step()?;
        let upper = length - 1 - lower;
        let (lower_key, upper_key) = (index_key(lower), index_key(upper));
        let lower_exists = has_property(&obj, &lower_key);
        let upper_exists = has_property(&obj, &upper_key);
        let lower_value = interp.get(&obj, &lower_key)?;
        let upper_value = interp.get(&obj, &upper_key)?;
        match (lower_exists, upper_exists) {
            (true, true) => {
                interp.set(&obj, lower_key, upper_value)?;
                interp.set(&obj, upper_key, lower_value)?;
            }
            (false, true) => {
                interp.set(&obj, lower_key, upper_value)?;
                interp.delete_property_or_throw(&obj, &upper_key)?;
            }
            (true, false) => {
                interp.delete_property_or_throw(&obj, &lower_key)?;
                interp.set(&obj, upper_key, lower_value)?;
            }
            (false, false) => {}
        }
        lower += 1;
    }
    Ok(JsValue::Object(obj))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Accessor methods
// ═══════════════════════════════════════════════════════════════════════════════

/// concat spreads arrays and appends everything else
pub fn array_concat(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let result = interp.create_array(Vec::new());
    let mut next = 0u64;
    let items = std::iter::once(JsValue::Object(obj)).chain(args.iter().cloned());
    for item in items {
        let spread = match &item {
            JsValue::Object(o) if o.borrow().is_array() => Some(o.cheap_clone()),
            _ => None,
        };
        match spread {
            Some(source) => {
                let length = interp.length_of_array_like(&source)?;
                for index in 0..length {
                    interp.charge_native_step()?;
                    let key = index_key(index);
                    if has_property(&source, &key) {
                        let value = interp.get(&source, &key)?;
                        interp.create_data_property_or_throw(&result, index_key(next), value)?;
                    }
                    next += 1;
                }
            }
            None => {
                interp.create_data_property_or_throw(&result, index_key(next), item)?;
                next += 1;
            }
        }
    }
    interp.set(&result, "length", JsValue::Number(next as f64))?;
    Ok(JsValue::Object(result))
}

pub fn array_slice(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    let start = relative_index(interp.to_integer_or_infinity(&arg(args, 0))?, length);
    let end = match arg(args, 1) {
        JsValue::Undefined => length,
        end => relative_index(interp.to_integer_or_infinity(&end)?, length),
    };

    let result = interp.create_array(Vec::new());
    let mut next = 0u64;
    for index in start..end.max(start) {
        interp.charge_native_step()?;
        let key = index_key(index);
        if has_property(&obj, &key) {
            let value = interp.get(&obj, &key)?;
            interp.create_data_property_or_throw(&result, index_key(next), value)?;
        }
        next += 1;
    }
    interp.set(&result, "length", JsValue::Number(next as f64))?;
    Ok(JsValue::Object(result))
}

pub fn array_join(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    let separator = match arg(args, 0) {
        JsValue::Undefined => ",".to_string(),
        sep => interp.to_string(&sep)?.to_string(),
    };
    let mut out = String::new();
    for index in 0..length {
        interp.charge_native_step()?;
        if index > 0 {
            out.push_str(&separator);
        }
        let element = interp.get(&obj, &index_key(index))?;
        if !element.is_null_or_undefined() {
            out.push_str(interp.to_string(&element)?.as_str());
        }
        if out.len() > MAX_STRING_LENGTH {
            return Err(JsError::range_error("Invalid string length"));
        }
    }
    Ok(JsValue::from(out))
}

pub fn array_to_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let join = interp.get(&obj, &PropertyKey::from("join"))?;
    if join.is_callable() {
        return interp.call_function(&join, JsValue::Object(obj), &[]);
    }
    object_to_string(interp, JsValue::Object(obj), &[])
}

pub fn array_index_of(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    let target = arg(args, 0);
    let start = relative_index(interp.to_integer_or_infinity(&arg(args, 1))?, length);
    for index in start..length {
        interp.charge_native_step()?;
        let key = index_key(index);
        if has_property(&obj, &key) && interp.get(&obj, &key)?.strict_equals(&target) {
            return Ok(JsValue::Number(index as f64));
        }
    }
    Ok(JsValue::Number(-1.0))
}

/// includes uses SameValueZero and treats holes as undefined
pub fn array_includes(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    let target = arg(args, 0);
    let start = relative_index(interp.to_integer_or_infinity(&arg(args, 1))?, length);
    for index in start..length {
        interp.charge_native_step()?;
        if interp.get(&obj, &index_key(index))?.same_value_zero(&target) {
            return Ok(JsValue::Boolean(true));
        }
    }
    Ok(JsValue::Boolean(false))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Iteration methods
// ═══════════════════════════════════════════════════════════════════════════════

/// Receiver, length and callback shared by the callback-taking methods
fn callback_setup(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
) -> Result<(JsObjectRef, u64, JsValue), JsError> {
    let obj = interp.to_object(this)?;
    let length = interp.length_of_array_like(&obj)?;
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(JsError::type_error(format!(
            "{} is not a function",
            interp.display_value(&callback)
        )));
    }
    Ok((obj, length, callback))
}

/// Visit present elements in order, calling `callback(value, index, obj)`.
/// `visit` sees each element with the callback result and may stop the walk.
fn each_element(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    mut visit: impl FnMut(&mut Interpreter, u64, JsValue, JsValue) -> Result<bool, JsError>,
) -> Result<(), JsError> {
    let (obj, length, callback) = callback_setup(interp, this, args)?;
    let this_arg = arg(args, 1);
    for index in 0..length {
        interp.charge_native_step()?;
        let key = index_key(index);
        if !has_property(&obj, &key) {
            continue;
        }
        let value = interp.get(&obj, &key)?;
        let result = interp.call_function(
            &callback,
            this_arg.cheap_clone(),
            &[value.cheap_clone(), JsValue::Number(index as f64), JsValue::Object(obj.cheap_clone())],
        )?;
        if !visit(interp, index, value, result)? {
            break;
        }
    }
    Ok(())
}

pub fn array_foreach(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    each_element(interp, &this, args, |_, _, _, _| Ok(true))?;
    Ok(JsValue::Undefined)
}

pub fn array_map(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    let length = interp.length_of_array_like(&obj)?;
    let result = interp.create_array(Vec::new());
    let target = result.cheap_clone();
    each_element(interp, &this, args, |interp, index, _, mapped| {
        interp.create_data_property_or_throw(&target, index_key(index), mapped)?;
        Ok(true)
    })?;
    interp.set(&result, "length", JsValue::Number(length as f64))?;
    Ok(JsValue::Object(result))
}

pub fn array_filter(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut kept = Vec::new();
    each_element(interp, &this, args, |_, _, value, selected| {
        if selected.to_boolean() {
            kept.push(value);
        }
        Ok(true)
    })?;
    Ok(JsValue::Object(interp.create_array(kept)))
}

pub fn array_find(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (obj, length, callback) = callback_setup(interp, &this, args)?;
    let this_arg = arg(args, 1);
    for index in 0..length {
        interp.charge_native_step()?;
        let value = interp.get(&obj, &index_key(index))?;
        let found = interp.call_function(
            &callback,
            this_arg.cheap_clone(),
            &[value.cheap_clone(), JsValue::Number(index as f64), JsValue::Object(obj.cheap_clone())],
        )?;
        if found.to_boolean() {
            return Ok(value);
        }
    }
    Ok(JsValue::Undefined)
}

pub fn array_some(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut any = false;
    each_element(interp, &this, args, |_, _, _, result| {
        any = result.to_boolean();
        Ok(!any)
    })?;
    Ok(JsValue::Boolean(any))
}

pub fn array_every(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut all = true;
    each_element(interp, &this, args, |_, _, _, result| {
        all = result.to_boolean();
        Ok(all)
    })?;
    Ok(JsValue::Boolean(all))
}

pub fn array_reduce(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let (obj, length, callback) = callback_setup(interp, &this, args)?;
    let mut index = 0;
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.cheap_clone(),
        None => loop {
            interp.charge_native_step()?;
            if index >= length {
                return Err(JsError::type_error("Reduce of empty array with no initial value"));
            }
            let key = index_key(index);
            index += 1;
            if has_property(&obj, &key) {
                break interp.get(&obj, &key)?;
            }
        },
    };
    while index < length {
        interp.charge_native_step()?;
        let key = index_key(index);
        if has_property(&obj, &key) {
            let value = interp.get(&obj, &key)?;
            accumulator = interp.call_function(
                &callback,
                JsValue::Undefined,
                &[accumulator, value, JsValue::Number(index as f64), JsValue::Object(obj.cheap_clone())],
            )?;
        }
        index += 1;
    }
    Ok(accumulator)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Iterators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn array_keys(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    Ok(create_array_iterator(interp, JsValue::Object(obj), IterationKind::Keys))
}

pub fn array_values(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    Ok(create_array_iterator(interp, JsValue::Object(obj), IterationKind::Values))
}

pub fn array_entries(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&this)?;
    Ok(create_array_iterator(interp, JsValue::Object(obj), IterationKind::Entries))
}
