//! Set built-in methods
//!
//! A Set is an [`OrderedTable`] whose entries map each value to itself.

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::iterator::{create_table_iterator, set_to_string_tag};
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::object::{IterationKind, JsObject, JsObjectRef, ObjectKind, OrderedTable, PropertyKey};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};

/// Initialize Set.prototype and the Set constructor
pub fn init_set(realm: &mut Realm) {
    let proto = realm.intrinsics.set_prototype.cheap_clone();

    realm.register_method(&proto, "add", set_add, 1);
    realm.register_method(&proto, "has", set_has, 1);
    realm.register_method(&proto, "delete", set_delete, 1);
    realm.register_method(&proto, "clear", set_clear, 0);
    realm.register_method(&proto, "forEach", set_foreach, 1);
    realm.register_method(&proto, "entries", set_entries, 0);
    realm.register_getter(&proto, "size", set_size);

    // keys, values and @@iterator are the same function object
    let values = realm.native_function("values", set_values, 0);
    {
        let mut p = proto.borrow_mut();
        p.set_hidden("values", JsValue::Object(values.cheap_clone()));
        p.set_hidden("keys", JsValue::Object(values.cheap_clone()));
        p.set_hidden(PropertyKey::Symbol(realm.symbols.iterator.cheap_clone()), JsValue::Object(values));
    }
    let tag = realm.symbols.to_string_tag.cheap_clone();
    set_to_string_tag(&proto, &tag, "Set");

    let constructor = realm.native_constructor("Set", set_constructor, 0, &proto);
    realm.define_global("Set", JsValue::Object(constructor));
}

/// new Set([iterable])
pub fn set_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if interp.new_target().is_none() {
        return Err(JsError::type_error("Constructor Set requires 'new'"));
    }
    let fallback = interp.realm.intrinsics.set_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    let set = JsValue::Object(JsObject::new(ObjectKind::Set(OrderedTable::new()), Some(proto)).into_ref());

    let iterable = arg(args, 0);
    if iterable.is_null_or_undefined() {
        return Ok(set);
    }
    let adder = interp.get_v(&set, &PropertyKey::from("add"))?;
    if !adder.is_callable() {
        return Err(JsError::type_error("'add' returned for Set is not callable"));
    }

    let mut record = interp.get_iterator(&iterable)?;
    while let Some(value) = interp.iterator_step_value(&mut record)? {
        if let Err(err) = interp.call_function(&adder, set.cheap_clone(), &[value]) {
            interp.iterator_close(&record, true)?;
            return Err(err);
        }
    }
    Ok(set)
}

fn this_set(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Set(_)) => Ok(obj.cheap_clone()),
        _ => Err(incompatible_receiver(method)),
    }
}

fn with_table<R>(set: &JsObjectRef, f: impl FnOnce(&mut OrderedTable) -> R) -> Option<R> {
    match &mut set.borrow_mut().kind {
        ObjectKind::Set(table) => Some(f(table)),
        _ => None,
    }
}

pub fn set_add(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "Set.prototype.add")?;
    let value = match arg(args, 0) {
        JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
        value => value,
    };
    with_table(&set, |t| {
        if !t.has(&value) {
            t.insert(value.cheap_clone(), value);
        }
    });
    Ok(this)
}

pub fn set_has(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "Set.prototype.has")?;
    let value = arg(args, 0);
    Ok(JsValue::Boolean(with_table(&set, |t| t.has(&value)).unwrap_or(false)))
}

pub fn set_delete(_interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "Set.prototype.delete")?;
    let value = arg(args, 0);
    Ok(JsValue::Boolean(with_table(&set, |t| t.remove(&value)).unwrap_or(false)))
}

pub fn set_clear(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "Set.prototype.clear")?;
    with_table(&set, OrderedTable::clear);
    Ok(JsValue::Undefined)
}

pub fn set_size(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "get Set.prototype.size")?;
    Ok(JsValue::Number(with_table(&set, |t| t.len()).unwrap_or(0) as f64))
}

pub fn set_foreach(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "Set.prototype.forEach")?;
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
        let entry = match &set.borrow().kind {
            ObjectKind::Set(t) => t.next_entry(position),
            _ => None,
        };
        let Some((slot, value, _)) = entry else {
            break;
        };
        position = slot + 1;
        interp.call_function(
            &callback,
            this_arg.cheap_clone(),
            &[value.cheap_clone(), value, this.cheap_clone()],
        )?;
    }
    Ok(JsValue::Undefined)
}

pub fn set_values(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "Set.prototype.values")?;
    Ok(create_table_iterator(interp, set, IterationKind::Values, false))
}

pub fn set_entries(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let set = this_set(&this, "Set.prototype.entries")?;
    Ok(create_table_iterator(interp, set, IterationKind::Entries, false))
}
