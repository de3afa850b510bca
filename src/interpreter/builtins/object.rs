//! Object constructor and Object.prototype methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::object::{
    JsObject, JsObjectRef, Property, PropertyDescriptor, PropertyKey, PropertySlot, has_property,
    is_prototype_of, set_prototype_of,
};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};

/// Initialize Object.prototype and the Object constructor with its static methods
pub fn init_object(realm: &mut Realm) {
    let proto = realm.intrinsics.object_prototype.cheap_clone();

    realm.register_method(&proto, "hasOwnProperty", object_has_own_property, 1);
    realm.register_method(&proto, "isPrototypeOf", object_is_prototype_of, 1);
    realm.register_method(&proto, "propertyIsEnumerable", object_property_is_enumerable, 1);
    realm.register_method(&proto, "toString", object_to_string, 0);
    realm.register_method(&proto, "valueOf", object_value_of, 0);

    let constructor = realm.native_constructor("Object", object_constructor, 1, &proto);

    // Property enumeration
    realm.register_method(&constructor, "keys", object_keys, 1);
    realm.register_method(&constructor, "values", object_values, 1);
    realm.register_method(&constructor, "entries", object_entries, 1);

    // Object manipulation
    realm.register_method(&constructor, "assign", object_assign, 2);
    realm.register_method(&constructor, "create", object_create, 2);
    realm.register_method(&constructor, "is", object_is, 2);

    // Extensibility
    realm.register_method(&constructor, "freeze", object_freeze, 1);
    realm.register_method(&constructor, "isFrozen", object_is_frozen, 1);
    realm.register_method(&constructor, "preventExtensions", object_prevent_extensions, 1);
    realm.register_method(&constructor, "isExtensible", object_is_extensible, 1);

    // Property descriptors
    realm.register_method(&constructor, "defineProperty", object_define_property, 3);
    realm.register_method(&constructor, "getOwnPropertyDescriptor", object_get_own_property_descriptor, 2);
    realm.register_method(&constructor, "getOwnPropertyNames", object_get_own_property_names, 1);

    // Prototype manipulation
    realm.register_method(&constructor, "getPrototypeOf", object_get_prototype_of, 1);
    realm.register_method(&constructor, "setPrototypeOf", object_set_prototype_of, 2);

    realm.define_global("Object", JsValue::Object(constructor));
}

/// Object(value): boxes primitives, creates a plain object for null/undefined
pub fn object_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    if !value.is_null_or_undefined() {
        return Ok(JsValue::Object(interp.to_object(&value)?));
    }
    let fallback = interp.realm.intrinsics.object_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    Ok(JsValue::Object(JsObject::ordinary(Some(proto)).into_ref()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Object.prototype
// ═══════════════════════════════════════════════════════════════════════════════

pub fn object_has_own_property(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let obj = interp.to_object(&this)?;
    let has = obj.borrow().has_own_property(&key);
    Ok(JsValue::Boolean(has))
}

pub fn object_is_prototype_of(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(value) = arg(args, 0) else {
        return Ok(JsValue::Boolean(false));
    };
    let proto = interp.to_object(&this)?;
    Ok(JsValue::Boolean(is_prototype_of(&proto, &value)))
}

pub fn object_property_is_enumerable(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let obj = interp.to_object(&this)?;
    let enumerable = obj.borrow().get_own_property(&key).is_some_and(|p| p.enumerable);
    Ok(JsValue::Boolean(enumerable))
}

/// Object.prototype.toString: `[object Tag]`, honouring @@toStringTag
pub fn object_to_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    match &this {
        JsValue::Undefined => return Ok(JsValue::from("[object Undefined]")),
        JsValue::Null => return Ok(JsValue::from("[object Null]")),
        _ => {}
    }
    let obj = interp.to_object(&this)?;
    let tag_key = PropertyKey::Symbol(interp.realm.symbols.to_string_tag.cheap_clone());
    let tag = match interp.get(&obj, &tag_key)? {
        JsValue::String(s) => s.to_string(),
        _ => obj.borrow().builtin_tag().to_string(),
    };
    Ok(JsValue::from(format!("[object {}]", tag)))
}

pub fn object_value_of(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Object(interp.to_object(&this)?))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Enumeration
// ═══════════════════════════════════════════════════════════════════════════════

pub fn object_keys(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&arg(args, 0))?;
    let keys = interp.enumerable_own_keys(&obj).iter().map(PropertyKey::to_value).collect();
    Ok(JsValue::Object(interp.create_array(keys)))
}

pub fn object_values(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&arg(args, 0))?;
    let mut values = Vec::new();
    for key in interp.enumerable_own_keys(&obj) {
        values.push(interp.get(&obj, &key)?);
    }
    Ok(JsValue::Object(interp.create_array(values)))
}

pub fn object_entries(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&arg(args, 0))?;
    let mut entries = Vec::new();
    for key in interp.enumerable_own_keys(&obj) {
        let value = interp.get(&obj, &key)?;
        let pair = interp.create_array(vec![key.to_value(), value]);
        entries.push(JsValue::Object(pair));
    }
    Ok(JsValue::Object(interp.create_array(entries)))
}

pub fn object_get_own_property_names(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&arg(args, 0))?;
    let names: Vec<JsValue> = obj
        .borrow()
        .own_property_keys()
        .iter()
        .filter(|k| !k.is_symbol())
        .map(PropertyKey::to_value)
        .collect();
    Ok(JsValue::Object(interp.create_array(names)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Creation and copying
// ═══════════════════════════════════════════════════════════════════════════════

/// Object.assign(target, ...sources): own enumerable properties, through [[Set]]
pub fn object_assign(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let target = interp.to_object(&arg(args, 0))?;
    for source in args.iter().skip(1) {
        if source.is_null_or_undefined() {
            continue;
        }
        let from = interp.to_object(source)?;
        let keys = from.borrow().own_property_keys();
        for key in keys {
            let enumerable = from.borrow().get_own_property(&key).is_some_and(|p| p.enumerable);
            if enumerable {
                let value = interp.get(&from, &key)?;
                interp.set(&target, key, value)?;
            }
        }
    }
    Ok(JsValue::Object(target))
}

pub fn object_create(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let proto = match arg(args, 0) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        other => {
            return Err(JsError::type_error(format!(
                "Object prototype may only be an Object or null: {}",
                interp.display_value(&other)
            )));
        }
    };
    let obj = JsObject::ordinary(proto).into_ref();
    let properties = arg(args, 1);
    if !properties.is_undefined() {
        define_properties(interp, &obj, &properties)?;
    }
    Ok(JsValue::Object(obj))
}

/// ObjectDefineProperties: every descriptor is read before any is applied
fn define_properties(interp: &mut Interpreter, obj: &JsObjectRef, properties: &JsValue) -> Result<(), JsError> {
    let props = interp.to_object(properties)?;
    let keys = props.borrow().own_property_keys();
    let mut descriptors = Vec::new();
    for key in keys {
        let enumerable = props.borrow().get_own_property(&key).is_some_and(|p| p.enumerable);
        if enumerable {
            let desc_obj = interp.get(&props, &key)?;
            descriptors.push((key, to_property_descriptor(interp, &desc_obj)?));
        }
    }
    for (key, desc) in descriptors {
        interp.define_property_or_throw(obj, key, desc)?;
    }
    Ok(())
}

pub fn object_is(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Boolean(arg(args, 0).same_value(&arg(args, 1))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Integrity levels
// ═══════════════════════════════════════════════════════════════════════════════

/// Object.freeze: every own property becomes non-configurable, data
/// properties non-writable, and the object non-extensible
pub fn object_freeze(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    let JsValue::Object(obj) = &value else {
        return Ok(value);
    };
    let mut o = obj.borrow_mut();
    o.prevent_extensions();
    for key in o.own_property_keys() {
        let Some(prop) = o.get_own_property(&key) else {
            continue;
        };
        let desc = PropertyDescriptor {
            configurable: Some(false),
            writable: if prop.is_accessor() { None } else { Some(false) },
            ..PropertyDescriptor::default()
        };
        if !o.define_own_property(key.cheap_clone(), desc) {
            return Err(JsError::type_error(format!("Cannot freeze property: {}", key)));
        }
    }
    drop(o);
    Ok(value)
}

pub fn object_is_frozen(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(obj) = arg(args, 0) else {
        return Ok(JsValue::Boolean(true));
    };
    let o = obj.borrow();
    if o.extensible {
        return Ok(JsValue::Boolean(false));
    }
    let frozen = o
        .own_property_keys()
        .iter()
        .filter_map(|key| o.get_own_property(key))
        .all(|prop| !prop.configurable && !prop.is_writable());
    Ok(JsValue::Boolean(frozen))
}

pub fn object_prevent_extensions(
    _interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let value = arg(args, 0);
    if let JsValue::Object(obj) = &value {
        obj.borrow_mut().prevent_extensions();
    }
    Ok(value)
}

pub fn object_is_extensible(_interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let extensible = match arg(args, 0) {
        JsValue::Object(obj) => obj.borrow().extensible,
        _ => false,
    };
    Ok(JsValue::Boolean(extensible))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Descriptors
// ═══════════════════════════════════════════════════════════════════════════════

pub fn object_define_property(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    let JsValue::Object(obj) = &target else {
        return Err(JsError::type_error("Object.defineProperty called on non-object"));
    };
    let key = interp.to_property_key(&arg(args, 1))?;
    let desc = to_property_descriptor(interp, &arg(args, 2))?;
    interp.define_property_or_throw(obj, key, desc)?;
    Ok(target)
}

pub fn object_get_own_property_descriptor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&arg(args, 0))?;
    let key = interp.to_property_key(&arg(args, 1))?;
    let prop = obj.borrow().get_own_property(&key);
    match prop {
        Some(prop) => Ok(from_property(interp, &prop)),
        None => Ok(JsValue::Undefined),
    }
}

/// ToPropertyDescriptor
pub(crate) fn to_property_descriptor(interp: &mut Interpreter, value: &JsValue) -> Result<PropertyDescriptor, JsError> {
    let JsValue::Object(obj) = value else {
        return Err(JsError::type_error(format!(
            "Property description must be an object: {}",
            interp.display_value(value)
        )));
    };
    let mut desc = PropertyDescriptor::default();
    let field = |interp: &mut Interpreter, name: &str| -> Result<Option<JsValue>, JsError> {
        let key = PropertyKey::from(name);
        if has_property(obj, &key) {
            interp.get(obj, &key).map(Some)
        } else {
            Ok(None)
        }
    };
    desc.enumerable = field(interp, "enumerable")?.map(|v| v.to_boolean());
    desc.configurable = field(interp, "configurable")?.map(|v| v.to_boolean());
    desc.value = field(interp, "value")?;
    desc.writable = field(interp, "writable")?.map(|v| v.to_boolean());
    for (name, slot) in [("get", &mut desc.get), ("set", &mut desc.set)] {
        if let Some(accessor) = field(interp, name)? {
            if !accessor.is_undefined() && !accessor.is_callable() {
                return Err(JsError::type_error(format!(
                    "{} must be a function: {}",
                    if name == "get" { "Getter" } else { "Setter" },
                    interp.display_value(&accessor)
                )));
            }
            *slot = Some(accessor);
        }
    }
    if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
        return Err(JsError::type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }
    Ok(desc)
}

/// FromPropertyDescriptor for a complete property
pub(crate) fn from_property(interp: &mut Interpreter, prop: &Property) -> JsValue {
    let obj = interp.create_object();
    {
        let mut o = obj.borrow_mut();
        match &prop.slot {
            PropertySlot::Data { value, writable } => {
                o.set_data("value", value.cheap_clone());
                o.set_data("writable", JsValue::Boolean(*writable));
            }
            PropertySlot::Accessor { get, set } => {
                let accessor = |f: &Option<JsObjectRef>| f.clone().map(JsValue::Object).unwrap_or_default();
                o.set_data("get", accessor(get));
                o.set_data("set", accessor(set));
            }
        }
        o.set_data("enumerable", JsValue::Boolean(prop.enumerable));
        o.set_data("configurable", JsValue::Boolean(prop.configurable));
    }
    JsValue::Object(obj)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Prototypes
// ═══════════════════════════════════════════════════════════════════════════════

pub fn object_get_prototype_of(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let obj = interp.to_object(&arg(args, 0))?;
    let proto = obj.borrow().prototype.clone();
    Ok(proto.map(JsValue::Object).unwrap_or(JsValue::Null))
}

pub fn object_set_prototype_of(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let target = arg(args, 0);
    if target.is_null_or_undefined() {
        return Err(incompatible_receiver("Object.setPrototypeOf"));
    }
    let proto = match arg(args, 1) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        other => {
            return Err(JsError::type_error(format!(
                "Object prototype may only be an Object or null: {}",
                interp.display_value(&other)
            )));
        }
    };
    let JsValue::Object(obj) = &target else {
        return Ok(target);
    };
    if !set_prototype_of(obj, proto) {
        let message = if obj.borrow().extensible {
            "Cyclic __proto__ value".to_string()
        } else {
            format!("{} is not extensible", interp.display_value(&target))
        };
        return Err(JsError::type_error(message));
    }
    Ok(target)
}
