//! Promise built-in methods
//!
//! Settlement and reaction scheduling live in the interpreter's job module;
//! this file only exposes them to script code.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::iterator::set_to_string_tag;
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::interpreter::iteration::IteratorRecord;
use crate::object::{JsObjectRef, ObjectKind, PromiseCapability, PropertyKey};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};

/// Initialize Promise.prototype and the Promise constructor
pub fn init_promise(realm: &mut Realm) {
    let proto = realm.intrinsics.promise_prototype.cheap_clone();

    realm.register_method(&proto, "then", promise_then, 2);
    realm.register_method(&proto, "catch", promise_catch, 1);
    realm.register_method(&proto, "finally", promise_finally, 1);
    let tag = realm.symbols.to_string_tag.cheap_clone();
    set_to_string_tag(&proto, &tag, "Promise");

    let constructor = realm.native_constructor("Promise", promise_constructor, 1, &proto);
    realm.register_method(&constructor, "resolve", promise_resolve_static, 1);
    realm.register_method(&constructor, "reject", promise_reject_static, 1);
    realm.register_method(&constructor, "all", promise_all, 1);
    realm.register_method(&constructor, "race", promise_race, 1);

    realm.intrinsics.promise_constructor = Some(constructor.cheap_clone());
    realm.define_global("Promise", JsValue::Object(constructor));
}

/// new Promise(executor)
pub fn promise_constructor(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if interp.new_target().is_none() {
        return Err(JsError::type_error("Promise constructor cannot be invoked without 'new'"));
    }
    let executor = arg(args, 0);
    if !executor.is_callable() {
        return Err(JsError::type_error(format!(
            "Promise resolver {} is not a function",
            interp.display_value(&executor)
        )));
    }

    let fallback = interp.realm.intrinsics.promise_prototype.cheap_clone();
    let proto = interp.prototype_from_new_target(&fallback)?;
    let promise = interp.create_promise_with_proto(proto);
    let (resolve, reject) = interp.create_resolving_functions(&promise);

    if let Err(err) = interp.call_function(&executor, JsValue::Undefined, &[resolve, reject.cheap_clone()]) {
        if !err.is_catchable() {
            return Err(err);
        }
        let reason = interp.error_value(err);
        interp.call_function(&reject, JsValue::Undefined, &[reason])?;
    }
    Ok(JsValue::Object(promise))
}

fn this_promise(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Promise(_)) => Ok(obj.cheap_clone()),
        _ => Err(incompatible_receiver(method)),
    }
}

/// SpeciesConstructor(promise, %Promise%), reduced to `constructor`
fn promise_species(interp: &mut Interpreter, promise: &JsObjectRef) -> Result<JsValue, JsError> {
    let intrinsic = interp
        .realm
        .intrinsics
        .promise_constructor
        .clone()
        .map(JsValue::Object)
        .unwrap_or_default();
    let constructor = interp.get(promise, &PropertyKey::from("constructor"))?;
    match constructor {
        JsValue::Undefined => Ok(intrinsic),
        c if c.is_constructor() => Ok(c),
        _ => Err(JsError::type_error("The promise constructor is not a constructor")),
    }
}

/// Promise.prototype.then(onFulfilled, onRejected)
pub fn promise_then(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let promise = this_promise(&this, "Promise.prototype.then")?;
    let constructor = promise_species(interp, &promise)?;
    let capability = interp.new_promise_capability(&constructor)?;
    let result = capability.promise.cheap_clone();
    interp.perform_then(&promise, arg(args, 0), arg(args, 1), Some(capability));
    Ok(result)
}

/// Promise.prototype.catch(onRejected)
pub fn promise_catch(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    interp.invoke(&this, &PropertyKey::from("then"), &[JsValue::Undefined, arg(args, 0)])
}

/// Promise.prototype.finally(onFinally)
pub fn promise_finally(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(promise) = &this else {
        return Err(incompatible_receiver("Promise.prototype.finally"));
    };
    let constructor = promise_species(interp, promise)?;
    let on_finally = arg(args, 0);
    if !on_finally.is_callable() {
        return interp.invoke(&this, &PropertyKey::from("then"), &[on_finally.cheap_clone(), on_finally]);
    }

    let (callback, ctor) = (on_finally.cheap_clone(), constructor.cheap_clone());
    let then_finally = interp.create_host_function("", move |interp, _this, args| {
        let value = arg(args, 0);
        let result = interp.call_function(&callback, JsValue::Undefined, &[])?;
        let promise = interp.promise_resolve(&ctor, result)?;
        let value_thunk = interp.create_host_function("", move |_, _, _| Ok(value.cheap_clone()));
        interp.invoke(&promise, &PropertyKey::from("then"), &[JsValue::Object(value_thunk)])
    });

    let (callback, ctor) = (on_finally, constructor);
    let catch_finally = interp.create_host_function("", move |interp, _this, args| {
        let reason = arg(args, 0);
        let result = interp.call_function(&callback, JsValue::Undefined, &[])?;
        let promise = interp.promise_resolve(&ctor, result)?;
        let thrower = interp.create_host_function("", move |_, _, _| Err(JsError::thrown(reason.cheap_clone())));
        interp.invoke(&promise, &PropertyKey::from("then"), &[JsValue::Object(thrower)])
    });

    interp.invoke(
        &this,
        &PropertyKey::from("then"),
        &[JsValue::Object(then_finally), JsValue::Object(catch_finally)],
    )
}

/// Promise.resolve(value)
pub fn promise_resolve_static(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if !this.is_object() {
        return Err(JsError::type_error("PromiseResolve called on non-object"));
    }
    interp.promise_resolve(&this, arg(args, 0))
}

/// Promise.reject(reason)
pub fn promise_reject_static(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let capability = interp.new_promise_capability(&this)?;
    interp.call_function(&capability.reject, JsValue::Undefined, &[arg(args, 0)])?;
    Ok(capability.promise)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Combinators
// ═══════════════════════════════════════════════════════════════════════════════

/// IfAbruptRejectPromise: a catchable failure rejects the capability,
/// closing the iterator first when it is still open
fn reject_abrupt(
    interp: &mut Interpreter,
    err: JsError,
    record: Option<&IteratorRecord>,
    capability: &PromiseCapability,
) -> Result<JsValue, JsError> {
    if !err.is_catchable() {
        return Err(err);
    }
    if let Some(record) = record
        && !record.done
    {
        interp.iterator_close(record, true)?;
    }
    let reason = interp.error_value(err);
    interp.call_function(&capability.reject, JsValue::Undefined, &[reason])?;
    Ok(capability.promise.cheap_clone())
}

/// The constructor's `resolve`, which must be callable
fn get_promise_resolve(interp: &mut Interpreter, constructor: &JsValue) -> Result<JsValue, JsError> {
    let resolve = interp.get_v(constructor, &PropertyKey::from("resolve"))?;
    if !resolve.is_callable() {
        return Err(JsError::type_error("Promise resolve is not a function"));
    }
    Ok(resolve)
}

/// Promise.all(iterable)
pub fn promise_all(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let capability = interp.new_promise_capability(&this)?;
    let resolve = match get_promise_resolve(interp, &this) {
        Ok(resolve) => resolve,
        Err(err) => return reject_abrupt(interp, err, None, &capability),
    };
    let mut record = match interp.get_iterator(&arg(args, 0)) {
        Ok(record) => record,
        Err(err) => return reject_abrupt(interp, err, None, &capability),
    };
    match perform_all(interp, &this, &resolve, &mut record, &capability) {
        Ok(()) => Ok(capability.promise.cheap_clone()),
        Err(err) => reject_abrupt(interp, err, Some(&record), &capability),
    }
}

fn perform_all(
    interp: &mut Interpreter,
    constructor: &JsValue,
    resolve: &JsValue,
    record: &mut IteratorRecord,
    capability: &PromiseCapability,
) -> Result<(), JsError> {
    let values: Rc<RefCell<Vec<JsValue>>> = Rc::new(RefCell::new(Vec::new()));
    // Starts at one so the count cannot reach zero before iteration ends
    let remaining = Rc::new(Cell::new(1usize));
    let mut index = 0;

    while let Some(next) = interp.iterator_step_value(record)? {
        values.borrow_mut().push(JsValue::Undefined);
        let next_promise = interp.call_function(resolve, constructor.cheap_clone(), &[next])?;

        let already_called = Cell::new(false);
        let (slot_values, slot_remaining, resolve_all) =
            (values.cheap_clone(), remaining.cheap_clone(), capability.resolve.cheap_clone());
        let resolve_element = interp.create_host_function("", move |interp, _this, args| {
            if already_called.replace(true) {
                return Ok(JsValue::Undefined);
            }
            if let Some(slot) = slot_values.borrow_mut().get_mut(index) {
                *slot = arg(args, 0);
            }
            slot_remaining.set(slot_remaining.get() - 1);
            if slot_remaining.get() == 0 {
                let collected = slot_values.borrow().clone();
                let array = interp.create_array(collected);
                interp.call_function(&resolve_all, JsValue::Undefined, &[JsValue::Object(array)])?;
            }
            Ok(JsValue::Undefined)
        });

        remaining.set(remaining.get() + 1);
        interp.invoke(
            &next_promise,
            &PropertyKey::from("then"),
            &[JsValue::Object(resolve_element), capability.reject.cheap_clone()],
        )?;
        index += 1;
    }

    remaining.set(remaining.get() - 1);
    if remaining.get() == 0 {
        let collected = values.borrow().clone();
        let array = interp.create_array(collected);
        interp.call_function(&capability.resolve, JsValue::Undefined, &[JsValue::Object(array)])?;
    }
    Ok(())
}

/// Promise.race(iterable)
pub fn promise_race(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let capability = interp.new_promise_capability(&this)?;
    let resolve = match get_promise_resolve(interp, &this) {
        Ok(resolve) => resolve,
        Err(err) => return reject_abrupt(interp, err, None, &capability),
    };
    let mut record = match interp.get_iterator(&arg(args, 0)) {
        Ok(record) => record,
        Err(err) => return reject_abrupt(interp, err, None, &capability),
    };
    let raced = (|| -> Result<(), JsError> {
        while let Some(next) = interp.iterator_step_value(&mut record)? {
            let next_promise = interp.call_function(&resolve, this.cheap_clone(), &[next])?;
            interp.invoke(
                &next_promise,
                &PropertyKey::from("then"),
                &[capability.resolve.cheap_clone(), capability.reject.cheap_clone()],
            )?;
        }
        Ok(())
    })();
    match raced {
        Ok(()) => Ok(capability.promise.cheap_clone()),
        Err(err) => reject_abrupt(interp, err, Some(&record), &capability),
    }
}
