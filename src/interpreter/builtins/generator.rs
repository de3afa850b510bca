//! Generator built-in methods
//!
//! A generator object owns its suspended [`ExecutionContext`]. Each
//! resumption takes the context out, delivers the value or abrupt
//! completion, and drives it until the next `yield` or the end of the body.

use crate::completion::Completion;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::iterator::set_to_string_tag;
use crate::interpreter::builtins::{arg, incompatible_receiver};
use crate::interpreter::exec::RunOutcome;
use crate::interpreter::frame::{ExecutionContext, YieldValue};
use crate::object::{GeneratorStatus, JsObjectRef, ObjectKind, Property, PropertyKey};
use crate::realm::Realm;
use crate::value::{CheapClone, JsValue};

/// Initialize %GeneratorFunction.prototype% and %GeneratorPrototype%
pub fn init_generator_prototype(realm: &mut Realm) {
    let proto = realm.intrinsics.generator_prototype.cheap_clone();
    let function_proto = realm.intrinsics.generator_function_prototype.cheap_clone();

    realm.register_method(&proto, "next", generator_next, 1);
    realm.register_method(&proto, "return", generator_return, 1);
    realm.register_method(&proto, "throw", generator_throw, 1);

    let tag = realm.symbols.to_string_tag.cheap_clone();
    set_to_string_tag(&proto, &tag, "Generator");
    set_to_string_tag(&function_proto, &tag, "GeneratorFunction");

    function_proto.borrow_mut().insert_property(
        PropertyKey::from("prototype"),
        Property::with_attributes(JsValue::Object(proto.cheap_clone()), false, false, true),
    );
    proto.borrow_mut().insert_property(
        PropertyKey::from("constructor"),
        Property::with_attributes(JsValue::Object(function_proto), false, false, true),
    );
}

/// What a resumption delivers to the suspended body
enum Delivery {
    Next(JsValue),
    Throw(JsValue),
    Return(JsValue),
}

/// Generator.prototype.next(value)
pub fn generator_next(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let generator = this_generator(&this, "Generator.prototype.next")?;
    generator_resume(interp, &generator, Delivery::Next(arg(args, 0)))
}

/// Generator.prototype.return(value)
pub fn generator_return(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let generator = this_generator(&this, "Generator.prototype.return")?;
    generator_resume(interp, &generator, Delivery::Return(arg(args, 0)))
}

/// Generator.prototype.throw(exception)
pub fn generator_throw(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let generator = this_generator(&this, "Generator.prototype.throw")?;
    generator_resume(interp, &generator, Delivery::Throw(arg(args, 0)))
}

fn this_generator(this: &JsValue, method: &str) -> Result<JsObjectRef, JsError> {
    match this {
        JsValue::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Generator(_)) => Ok(obj.cheap_clone()),
        _ => Err(incompatible_receiver(method)),
    }
}

fn set_status(generator: &JsObjectRef, status: GeneratorStatus, context: Option<Box<ExecutionContext>>) {
    if let ObjectKind::Generator(state) = &mut generator.borrow_mut().kind {
        state.status = status;
        state.context = context;
    }
}

/// GeneratorResume / GeneratorResumeAbrupt
fn generator_resume(interp: &mut Interpreter, generator: &JsObjectRef, delivery: Delivery) -> Result<JsValue, JsError> {
    let (status, ctx) = {
        let mut g = generator.borrow_mut();
        let ObjectKind::Generator(state) = &mut g.kind else {
            return Err(incompatible_receiver("Generator.prototype.next"));
        };
        if state.status == GeneratorStatus::Executing {
            return Err(JsError::type_error("Generator is already running"));
        }
        (state.status, state.context.take())
    };

    // A generator that never started completes without running its body
    let starting_abruptly = status == GeneratorStatus::SuspendedStart && !matches!(delivery, Delivery::Next(_));
    let mut ctx = match ctx {
        Some(ctx) if status != GeneratorStatus::Completed && !starting_abruptly => ctx,
        _ => return completed_result(interp, generator, delivery),
    };
    match delivery {
        Delivery::Next(value) => {
            if status == GeneratorStatus::SuspendedYield {
                ctx.push_value(value);
            }
        }
        Delivery::Throw(value) => ctx.abrupt(Completion::Throw(value)),
        Delivery::Return(value) => ctx.abrupt(Completion::Return(value)),
    }
    set_status(generator, GeneratorStatus::Executing, None);

    match interp.drive_nested(ctx) {
        Ok(RunOutcome::Yielded(ctx, yielded)) => {
            set_status(generator, GeneratorStatus::SuspendedYield, Some(ctx));
            match yielded {
                YieldValue::Value(value) => Ok(interp.create_iter_result(value, false)),
                YieldValue::Delegate(result) => Ok(result),
            }
        }
        Ok(RunOutcome::Finished(mut ctx)) => {
            set_status(generator, GeneratorStatus::Completed, None);
            match ctx.take_completion() {
                Completion::Throw(value) => Err(JsError::Throw(value)),
                Completion::Normal(value) => Ok(interp.create_iter_result(value.unwrap_or_default(), true)),
                _ => Err(JsError::internal_error("abrupt completion escaped a generator body")),
            }
        }
        Ok(RunOutcome::Awaiting(..) | RunOutcome::Parked(_)) => {
            set_status(generator, GeneratorStatus::Completed, None);
            Err(JsError::internal_error("generator suspended outside a yield"))
        }
        Err(err) => {
            set_status(generator, GeneratorStatus::Completed, None);
            Err(err)
        }
    }
}

/// Resumption of a generator whose body will not run again
fn completed_result(interp: &mut Interpreter, generator: &JsObjectRef, delivery: Delivery) -> Result<JsValue, JsError> {
    set_status(generator, GeneratorStatus::Completed, None);
    match delivery {
        Delivery::Next(_) => Ok(interp.create_iter_result(JsValue::Undefined, true)),
        Delivery::Return(value) => Ok(interp.create_iter_result(value, true)),
        Delivery::Throw(value) => Err(JsError::Throw(value)),
    }
}
