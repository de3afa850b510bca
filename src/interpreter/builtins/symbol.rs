//! Symbol built-in object implementation
//!
//! Symbol identities come from the realm's counter; the `Symbol.for`
//! registry lives on the realm too, so interpreters never share symbols.

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::iterator::set_to_string_tag;
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::object::{ObjectKind, Property, PropertyKey};
use crate::realm::Realm;
use crate::value::{CheapClone, JsSymbol, JsValue};

/// Initialize Symbol.prototype, the Symbol function and the well-known symbols
pub fn init_symbol(realm: &mut Realm) {
    let proto = realm.intrinsics.symbol_prototype.cheap_clone();

    realm.register_method(&proto, "toString", symbol_to_string, 0);
    realm.register_method(&proto, "valueOf", symbol_value_of, 0);
    realm.register_getter(&proto, "description", symbol_description);
    let to_primitive = realm.symbols.to_primitive.cheap_clone();
    realm.register_symbol_method(&proto, &to_primitive, symbol_value_of, 1);
    let tag = realm.symbols.to_string_tag.cheap_clone();
    set_to_string_tag(&proto, &tag, "Symbol");

    // Symbol is callable but `new Symbol()` throws, so it is not a constructor
    let constructor = realm.native_function("Symbol", symbol_constructor_fn, 0);
    constructor.borrow_mut().insert_property(
        PropertyKey::from("prototype"),
        Property::frozen(JsValue::Object(proto.cheap_clone())),
    );
    proto
        .borrow_mut()
        .set_hidden("constructor", JsValue::Object(constructor.cheap_clone()));

    realm.register_method(&constructor, "for", symbol_for, 1);
    realm.register_method(&constructor, "keyFor", symbol_key_for, 1);

    let well_known = [
        ("iterator", realm.symbols.iterator.cheap_clone()),
        ("asyncIterator", realm.symbols.async_iterator.cheap_clone()),
        ("hasInstance", realm.symbols.has_instance.cheap_clone()),
        ("toPrimitive", realm.symbols.to_primitive.cheap_clone()),
        ("toStringTag", realm.symbols.to_string_tag.cheap_clone()),
        ("unscopables", realm.symbols.unscopables.cheap_clone()),
    ];
    for (name, sym) in well_known {
        constructor
            .borrow_mut()
            .insert_property(PropertyKey::from(name), Property::frozen(JsValue::Symbol(sym)));
    }

    realm.define_global("Symbol", JsValue::Object(constructor));
}

/// Symbol([description])
pub fn symbol_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let description = match arg(args, 0) {
        JsValue::Undefined => None,
        value => Some(interp.to_string(&value)?),
    };
    Ok(JsValue::Symbol(interp.realm.new_symbol(description)))
}

/// thisSymbolValue
fn this_symbol_value(this: &JsValue, method: &str) -> Result<JsSymbol, JsError> {
    match this {
        JsValue::Symbol(sym) => Ok(sym.cheap_clone()),
        JsValue::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Symbol(sym) => Ok(sym.cheap_clone()),
            _ => Err(incompatible_receiver(method)),
        },
        _ => Err(incompatible_receiver(method)),
    }
}

pub fn symbol_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let sym = this_symbol_value(&this, "Symbol.prototype.toString")?;
    Ok(JsValue::from(sym.descriptive_string()))
}

pub fn symbol_value_of(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    this_symbol_value(&this, "Symbol.prototype.valueOf").map(JsValue::Symbol)
}

pub fn symbol_description(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let sym = this_symbol_value(&this, "Symbol.prototype.description")?;
    Ok(sym.description.clone().map(JsValue::String).unwrap_or_default())
}

/// Symbol.for(key)
pub fn symbol_for(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let key = interp.to_string(&arg(args, 0))?;
    Ok(JsValue::Symbol(interp.realm.registered_symbol(key)))
}

/// Symbol.keyFor(sym)
pub fn symbol_key_for(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Symbol(sym) = arg(args, 0) else {
        return Err(JsError::type_error("Symbol.keyFor requires a symbol"));
    };
    Ok(interp.realm.symbol_key(&sym).map(JsValue::String).unwrap_or_default())
}
