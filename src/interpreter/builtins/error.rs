//! Error constructor built-in methods

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::arg;
use crate::object::{JsObject, JsObjectRef, NativeFn, ObjectKind, PropertyKey, has_property};
use crate::realm::{ErrorKind, Realm};
use crate::value::{CheapClone, JsValue};

/// Initialize Error and all derived error constructors and add them to globals
pub fn init_errors(realm: &mut Realm) {
    let error_proto = realm.intrinsics.error_prototype(ErrorKind::Error);
    realm.register_method(&error_proto, "toString", error_to_string, 0);

    let mut error_constructor: Option<JsObjectRef> = None;
    for kind in ErrorKind::ALL {
        let proto = realm.intrinsics.error_prototype(kind);
        {
            let mut p = proto.borrow_mut();
            p.set_hidden("name", JsValue::from(kind.name()));
            p.set_hidden("message", JsValue::from(""));
        }

        let constructor = realm.native_constructor(kind.name(), constructor_for(kind), 1, &proto);
        // NativeError constructors inherit from %Error%
        if let Some(base) = &error_constructor {
            constructor.borrow_mut().prototype = Some(base.cheap_clone());
        } else {
            error_constructor = Some(constructor.cheap_clone());
        }
        realm.define_global(kind.name(), JsValue::Object(constructor));
    }
}

fn constructor_for(kind: ErrorKind) -> NativeFn {
    match kind {
        ErrorKind::Error => error_constructor,
        ErrorKind::TypeError => type_error_constructor,
        ErrorKind::ReferenceError => reference_error_constructor,
        ErrorKind::RangeError => range_error_constructor,
        ErrorKind::SyntaxError => syntax_error_constructor,
        ErrorKind::EvalError => eval_error_constructor,
        ErrorKind::URIError => uri_error_constructor,
    }
}

pub fn error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error_from(interp, ErrorKind::Error, args)
}

pub fn type_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error_from(interp, ErrorKind::TypeError, args)
}

pub fn reference_error_constructor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    create_error_from(interp, ErrorKind::ReferenceError, args)
}

pub fn range_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error_from(interp, ErrorKind::RangeError, args)
}

pub fn syntax_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error_from(interp, ErrorKind::SyntaxError, args)
}

pub fn eval_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error_from(interp, ErrorKind::EvalError, args)
}

pub fn uri_error_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    create_error_from(interp, ErrorKind::URIError, args)
}

/// Shared body of the error constructors. Calling without `new` behaves
/// the same as constructing.
fn create_error_from(interp: &mut Interpreter, kind: ErrorKind, args: &[JsValue]) -> Result<JsValue, JsError> {
    let fallback = interp.realm.intrinsics.error_prototype(kind);
    let proto = match interp.new_target() {
        Some(_) => interp.prototype_from_new_target(&fallback)?,
        None => fallback,
    };
    let error = JsObject::new(ObjectKind::Error, Some(proto)).into_ref();

    let message = arg(args, 0);
    if !message.is_undefined() {
        let message = interp.to_string(&message)?;
        error.borrow_mut().set_hidden("message", JsValue::String(message));
    }

    // InstallErrorCause
    if let JsValue::Object(options) = arg(args, 1) {
        let cause_key = PropertyKey::from("cause");
        if has_property(&options, &cause_key) {
            let cause = interp.get(&options, &cause_key)?;
            error.borrow_mut().set_hidden("cause", cause);
        }
    }
    Ok(JsValue::Object(error))
}

/// Error.prototype.toString
pub fn error_to_string(interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(obj) = &this else {
        return Err(JsError::type_error("Error.prototype.toString called on non-object"));
    };
    let name = match interp.get(obj, &PropertyKey::from("name"))? {
        JsValue::Undefined => "Error".to_string(),
        name => interp.to_string(&name)?.to_string(),
    };
    let message = match interp.get(obj, &PropertyKey::from("message"))? {
        JsValue::Undefined => String::new(),
        message => interp.to_string(&message)?.to_string(),
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (true, _) => message,
        (false, true) => name,
        (false, false) => format!("{}: {}", name, message),
    };
    Ok(JsValue::from(text))
}
