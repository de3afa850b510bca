//! Map built-in methods
//!
//! Entries live in an [`OrderedTable`] keyed by SameValueZero, so `-0` and
//! `+0` are one key and iteration follows insertion order.

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::iterator::{create_table_iterator, set_to_string_tag};
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::object::{IterationKind, JsObject, JsObjectRef, ObjectKind, OrderedTable, PropertyKey};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};

/// Initialize Map.prototype and the Map constructor
pub fn init_map(realm: &mut Realm) {
    let proto = realm.intrinsics.map_prototype.cheap_clone();

    realm.register_method(&proto, "get", map_get, 1);
    realm.register_method(&proto, "set", map_set, 2);
    realm.register_method(&proto, "has", map_has, 1);
    realm.register_method(&proto, "delete", map_delete, 1);
    realm.register_method(&proto, "clear", map_clear, 0);
    realm.register_method(&proto, "forEach", map_foreach, 1);
    realm.register_method(&proto, "keys", map_keys, 0);
    realm.register_method(&proto, "values", map_values, 0);
    realm.register_getter(&proto, "size", map_size);

    // entries and @@iterator are the same function object
    let entries = realm.native_function("entries", map_entries, 0);
    proto.borrow_mut().set_hidden("entries", JsValue::Object(entries.cheap_clone()));
    let iterator = realm.symbols.iterator.cheap_clone();
    proto
        .borrow_mut()
        .set_hidden(PropertyKey::Symbol(iterator), JsValue::Object(entries));
    let tag = realm.symbols.to_string_tag.cheap_clone();
    set_to_string_tag(&proto, &tag, "Map");

    let constructor = realm.native_constructor("Map", map_constructor, 0, &proto);
    realm.define_global("Map", JsValue::Object(constructor));
}

/// new Map([iterable])
pub fn map_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if interp.new_target().is_none() {
        return Err(JsError::type_error("Constructor Map requires 'new'"));
    }
    let fallback = interp.realm.intrinsics.map_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    let map = JsValue::Object(JsObject::new(ObjectKind::Map(OrderedTable::new()), Some(proto)).into_ref());

    let iterable = arg(args, 0);
    if iterable.is_null_or_undefined() {
        return Ok(map);
    }
    let adder = interp.get_v(&map, &PropertyKey::from("set"))?;
    if !adder.is_callable() {
        return Err(JsError::type_error("'set' returned for Map is not callable"));
    }

    let mut record = interp.get_iterator(&iterable)?;
    while let Some(entry) = interp.iterator_step_value(&mut record)? {
        let added = add_entry(interp, &map, &adder, &entry);
        if let Err(err) = added {
            interp.iterator_close(&record, true)?;
            return Err(err);
        }
    }
    Ok(map)
}

/// One step of AddEntriesFromIterable
fn add_entry(interp: &mut Interpreter, map: &JsValue, adder: &JsValue, entry: &JsValue) -> Result<(), JsError> {
    if !entry.is_object() {
        return Err(JsError::type_error(format!(
            "Iterator value {} is not an entry object",
            interp.display_value(entry)
        )));
    }
    let key = interp.get_v(entry, &PropertyKey::Index(0))?;
    let value = interp.get_v(entry, &PropertyKey::Index(1))?;
    interp.call_function(adder, map.cheap_clone(), &[key, value])?;
    Ok(())
}

/// The receiver's table, or a TypeError naming `method`
fn this_map(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Map(_)) => Ok(obj.cheap_clone()),
        _ => Err(incompatible_receiver(method)),
    }
}

fn with_table<R>(map: &JsObjectRef, f: impl FnOnce(&mut OrderedTable) -> R) -> Option<R> {
    match &mut map.borrow_mut().kind {
        ObjectKind::Map(table) => Some(f(table)),
        _ => None,
    }
}

pub fn map_get(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.get")?;
    let key = arg(args, 0);
    Ok(with_table(&map, |t| t.get(&key).cloned()).flatten().unwrap_or_default())
}

pub fn map_set(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.set")?;
    with_table(&map, |t| t.insert(arg(args, 0), arg(args, 1)));
    Ok(this)
}

pub fn map_has(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.has")?;
    let key = arg(args, 0);
    Ok(JsValue::Boolean(with_table(&map, |t| t.has(&key)).unwrap_or(false)))
}

pub fn map_delete(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.delete")?;
    let key = arg(args, 0);
    Ok(JsValue::Boolean(with_table(&map, |t| t.remove(&key)).unwrap_or(false)))
}

pub fn map_clear(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.clear")?;
    with_table(&map, OrderedTable::clear);
    Ok(JsValue::Undefined)
}

pub fn map_size(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "get Map.prototype.size")?;
    let size = with_table(&map, |t| t.len()).unwrap_or(0);
    Ok(JsValue::Number(size as f64))
}

/// Map.prototype.forEach: visits entries added during the walk
pub fn map_foreach(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.forEach")?;
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(JsError::type_error(format!(
            "{} is not a function",
            interp.display_value(&callback)
        )));
    }
    let this_arg = arg(args, 1);
    let mut position = 0;
    loop {
        let entry = match &map.borrow().kind {
            ObjectKind::Map(t) => t.next_entry(position),
            _ => None,
        };
        let Some((slot, key, value)) = entry else {
            break;
        };
        position = slot + 1;
        interp.call_function(&callback, this_arg.cheap_clone(), &[value, key, this.cheap_clone()])?;
    }
    Ok(JsValue::Undefined)
}

pub fn map_keys(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.keys")?;
    Ok(create_table_iterator(interp, map, IterationKind::Keys, true))
}

pub fn map_values(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.values")?;
    Ok(create_table_iterator(interp, map, IterationKind::Values, true))
}

pub fn map_entries(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let map = this_map(&this, "Map.prototype.entries")?;
    Ok(create_table_iterator(interp, map, IterationKind::Entries, true))
}
