//! Boolean built-in methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::incompatible_receiver;
use crate::object::{JsObject, ObjectKind};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};

/// Initialize Boolean.prototype and the Boolean constructor
pub fn init_boolean(realm: &mut Realm) {
    let proto = realm.intrinsics.boolean_prototype.cheap_clone();

    realm.register_method(&proto, "toString", boolean_to_string, 0);
    realm.register_method(&proto, "valueOf", boolean_value_of, 0);

    let constructor = realm.native_constructor("Boolean", boolean_constructor_fn, 1, &proto);
    realm.define_global("Boolean", JsValue::Object(constructor));
}

/// Boolean(value) converts; `new Boolean(value)` wraps
pub fn boolean_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let b = args.first().map(JsValue::to_boolean).unwrap_or(false);
    if interp.new_target().is_none() {
        return Ok(JsValue::Boolean(b));
    }
    let fallback = interp.realm.intrinsics.boolean_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    Ok(JsValue::Object(JsObject::new(ObjectKind::Boolean(b), Some(proto)).into_ref()))
}

/// thisBooleanValue
fn this_boolean_value(this: &JsValue, method: &str) -> Result<bool, JsError> {
    match this {
        JsValue::Boolean(b) => Ok(*b),
        JsValue::Object(obj) => match obj.borrow().kind {
            ObjectKind::Boolean(b) => Ok(b),
            _ => Err(incompatible_receiver(method)),
        },
        _ => Err(incompatible_receiver(method)),
    }
}

pub fn boolean_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let b = this_boolean_value(&this, "Boolean.prototype.toString")?;
    Ok(JsValue::from(if b { "true" } else { "false" }))
}

pub fn boolean_value_of(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    this_boolean_value(&this, "Boolean.prototype.valueOf").map(JsValue::Boolean)
}
