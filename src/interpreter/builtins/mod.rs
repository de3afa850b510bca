//! Built-in function implementations for the baseline library
//!
//! [`install`] runs once while the realm is created. Prototype objects come
//! from [`crate::realm::Intrinsics`]; each module fills in its prototype,
//! creates its constructor and defines the matching globals.

pub mod array;
pub mod boolean;
pub mod console;
pub mod error;
pub mod function;
pub mod generator;
pub mod global;
pub mod iterator;
pub mod map;
pub mod number;
pub mod object;
pub mod promise;
pub mod set;
pub mod string;
pub mod symbol;

use crate::error::JsError;
use crate::realm::Realm;
use crate::value::JsValue;

/// Populate the global object of a fresh realm
pub fn install(realm: &mut Realm) {
    object::init_object(realm);
    function::init_function(realm);
    iterator::init_iterator_prototypes(realm);
    array::init_array(realm);
    string::init_string(realm);
    number::init_number(realm);
    boolean::init_boolean(realm);
    symbol::init_symbol(realm);
    error::init_errors(realm);
    map::init_map(realm);
    set::init_set(realm);
    promise::init_promise(realm);
    generator::init_generator_prototype(realm);
    global::init_globals(realm);
    console::init_console(realm);
}

/// The argument at `index`, `undefined` when missing
pub(crate) fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

/// TypeError for a builtin method called on the wrong kind of receiver
pub(crate) fn incompatible_receiver(method: &str) -> JsError {
    JsError::type_error(format!("Method {} called on incompatible receiver", method))
}
