//! Console built-in methods, routed to the `log` facade

use log::{debug, error, info, warn};

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::object::JsObject;
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};

/// Create the console object with log, error, warn, info and debug
pub fn init_console(realm: &mut Realm) {
    let console = JsObject::ordinary(Some(realm.intrinsics.object_prototype.cheap_clone())).into_ref();
    realm.register_method(&console, "log", console_log, 0);
    realm.register_method(&console, "info", console_info, 0);
    realm.register_method(&console, "warn", console_warn, 0);
    realm.register_method(&console, "error", console_error, 0);
    realm.register_method(&console, "debug", console_debug, 0);
    realm.define_global("console", JsValue::Object(console));
}

/// Render arguments the way a console line shows them, without running
/// script code
fn format_args(interp: &Interpreter, args: &[JsValue]) -> String {
    args.iter()
        .map(|value| interp.display_value(value))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn console_log(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    info!(target: "stepjs::console", "{}", format_args(interp, args));
    Ok(JsValue::Undefined)
}

pub fn console_info(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    info!(target: "stepjs::console", "{}", format_args(interp, args));
    Ok(JsValue::Undefined)
}

pub fn console_warn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    warn!(target: "stepjs::console", "{}", format_args(interp, args));
    Ok(JsValue::Undefined)
}

pub fn console_error(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    error!(target: "stepjs::console", "{}", format_args(interp, args));
    Ok(JsValue::Undefined)
}

pub fn console_debug(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    debug!(target: "stepjs::console", "{}", format_args(interp, args));
    Ok(JsValue::Undefined)
}
