//! %IteratorPrototype% and the builtin iterator prototypes
//!
//! Array, Map, Set and String iterators keep their cursor in an object slot.
//! Map and Set iterators walk the live table, so entries added during
//! iteration are visited and deleted ones are skipped.

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::incompatible_receiver;
use crate::interpreter::ops::index_key;
use crate::object::{
    ArrayIteratorState, IterationKind, JsObject, JsObjectRef, NativeFn, ObjectKind, Property, PropertyKey,
    StringIteratorState, TableIteratorState,
};
use crate::realm::Realm;
use crate::value::{CheapClone, JsString, JsSymbol, JsValue};

pub fn init_iterator_prototypes(realm: &mut Realm) {
    let iterator_proto = realm.intrinsics.iterator_prototype.cheap_clone();
    let iterator_sym = realm.symbols.iterator.cheap_clone();
    realm.register_symbol_method(&iterator_proto, &iterator_sym, iterator_self, 0);

    let tag = realm.symbols.to_string_tag.cheap_clone();
    let prototypes = [
        (realm.intrinsics.array_iterator_prototype.cheap_clone(), "Array Iterator", array_iterator_next as NativeFn),
        (realm.intrinsics.map_iterator_prototype.cheap_clone(), "Map Iterator", map_iterator_next as NativeFn),
        (realm.intrinsics.set_iterator_prototype.cheap_clone(), "Set Iterator", set_iterator_next as NativeFn),
        (realm.intrinsics.string_iterator_prototype.cheap_clone(), "String Iterator", string_iterator_next as NativeFn),
    ];
    for (proto, name, next) in prototypes {
        realm.register_method(&proto, "next", next, 0);
        set_to_string_tag(&proto, &tag, name);
    }
}

/// A non-writable @@toStringTag
pub(crate) fn set_to_string_tag(obj: &JsObjectRef, tag: &JsSymbol, name: &str) {
    obj.borrow_mut().insert_property(
        PropertyKey::Symbol(tag.cheap_clone()),
        Property::with_attributes(JsValue::from(name), false, false, true),
    );
}

/// %IteratorPrototype%[@@iterator]
pub fn iterator_self(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(this)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constructors
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn create_array_iterator(interp: &mut Interpreter, target: JsValue, kind: IterationKind) -> JsValue {
    let proto = interp.realm.intrinsics.array_iterator_prototype.cheap_clone();
    let state = ArrayIteratorState {
        target,
        index: 0,
        kind,
        done: false,
    };
    JsValue::Object(JsObject::new(ObjectKind::ArrayIterator(state), Some(proto)).into_ref())
}

pub(crate) fn create_table_iterator(
    interp: &mut Interpreter,
    table: JsObjectRef,
    kind: IterationKind,
    is_map: bool,
) -> JsValue {
    let state = TableIteratorState {
        table,
        position: 0,
        kind,
        done: false,
    };
    let (object_kind, proto) = if is_map {
        (ObjectKind::MapIterator(state), interp.realm.intrinsics.map_iterator_prototype.cheap_clone())
    } else {
        (ObjectKind::SetIterator(state), interp.realm.intrinsics.set_iterator_prototype.cheap_clone())
    };
    JsValue::Object(JsObject::new(object_kind, Some(proto)).into_ref())
}

pub(crate) fn create_string_iterator(interp: &mut Interpreter, text: JsString) -> JsValue {
    let proto = interp.realm.intrinsics.string_iterator_prototype.cheap_clone();
    let state = StringIteratorState {
        text,
        offset: 0,
        done: false,
    };
    JsValue::Object(JsObject::new(ObjectKind::StringIterator(state), Some(proto)).into_ref())
}

// ═══════════════════════════════════════════════════════════════════════════════
// next()
// ═══════════════════════════════════════════════════════════════════════════════

/// %ArrayIteratorPrototype%.next: reads the length on every step
pub fn array_iterator_next(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(iter) = &this else {
        return Err(incompatible_receiver("Array Iterator.prototype.next"));
    };
    let (target, index, kind) = match &iter.borrow().kind {
        ObjectKind::ArrayIterator(state) if state.done => return Ok(interp.create_iter_result(JsValue::Undefined, true)),
        ObjectKind::ArrayIterator(state) => (state.target.cheap_clone(), state.index, state.kind),
        _ => return Err(incompatible_receiver("Array Iterator.prototype.next")),
    };

    let length = match &target {
        JsValue::Object(obj) => interp.length_of_array_like(obj)?,
        _ => 0,
    };
    if u64::from(index) >= length {
        if let ObjectKind::ArrayIterator(state) = &mut iter.borrow_mut().kind {
            state.done = true;
        }
        return Ok(interp.create_iter_result(JsValue::Undefined, true));
    }
    if let ObjectKind::ArrayIterator(state) = &mut iter.borrow_mut().kind {
        state.index = index + 1;
    }

    let key_value = JsValue::Number(f64::from(index));
    let result = match kind {
        IterationKind::Keys => key_value,
        IterationKind::Values => interp.get_v(&target, &index_key(u64::from(index)))?,
        IterationKind::Entries => {
            let value = interp.get_v(&target, &index_key(u64::from(index)))?;
            JsValue::Object(interp.create_array(vec![key_value, value]))
        }
    };
    Ok(interp.create_iter_result(result, false))
}

pub fn map_iterator_next(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    table_iterator_next(interp, this, true)
}

pub fn set_iterator_next(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    table_iterator_next(interp, this, false)
}

fn table_iterator_next(interp: &mut Interpreter, this: JsValue, is_map: bool) -> Result<JsValue, JsError> {
    let method = if is_map {
        "Map Iterator.prototype.next"
    } else {
        "Set Iterator.prototype.next"
    };
    let JsValue::Object(iter) = &this else {
        return Err(incompatible_receiver(method));
    };
    let (table, position, kind) = match &iter.borrow().kind {
        ObjectKind::MapIterator(state) | ObjectKind::SetIterator(state) if state.done => {
            return Ok(interp.create_iter_result(JsValue::Undefined, true));
        }
        ObjectKind::MapIterator(state) if is_map => (state.table.cheap_clone(), state.position, state.kind),
        ObjectKind::SetIterator(state) if !is_map => (state.table.cheap_clone(), state.position, state.kind),
        _ => return Err(incompatible_receiver(method)),
    };

    let entry = match &table.borrow().kind {
        ObjectKind::Map(t) | ObjectKind::Set(t) => t.next_entry(position),
        _ => None,
    };
    let Some((slot, key, value)) = entry else {
        if let ObjectKind::MapIterator(state) | ObjectKind::SetIterator(state) = &mut iter.borrow_mut().kind {
            state.done = true;
        }
        return Ok(interp.create_iter_result(JsValue::Undefined, true));
    };
    if let ObjectKind::MapIterator(state) | ObjectKind::SetIterator(state) = &mut iter.borrow_mut().kind {
        state.position = slot + 1;
    }

    let result = match kind {
        IterationKind::Keys => key,
        IterationKind::Values => value,
        IterationKind::Entries => JsValue::Object(interp.create_array(vec![key, value])),
    };
    Ok(interp.create_iter_result(result, false))
}

/// %StringIteratorPrototype%.next: one code point per step
pub fn string_iterator_next(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(iter) = &this else {
        return Err(incompatible_receiver("String Iterator.prototype.next"));
    };
    let next = {
        let mut o = iter.borrow_mut();
        let ObjectKind::StringIterator(state) = &mut o.kind else {
            return Err(incompatible_receiver("String Iterator.prototype.next"));
        };
        let ch = if state.done {
            None
        } else {
            state.text.as_str().get(state.offset..).and_then(|rest| rest.chars().next())
        };
        match ch {
            Some(ch) => {
                state.offset += ch.len_utf8();
                Some(ch)
            }
            None => {
                state.done = true;
                None
            }
        }
    };
    match next {
        Some(ch) => Ok(interp.create_iter_result(JsValue::from(ch.to_string()), false)),
        None => Ok(interp.create_iter_result(JsValue::Undefined, true)),
    }
}
