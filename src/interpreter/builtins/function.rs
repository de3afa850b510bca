//! Function.prototype built-in methods (call, apply, bind) and Function constructor

use crate::ast::{Expression, SourceType, Statement};
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::builtins::arg;
use crate::object::{BoundFunction, JsFunction, JsObject, ObjectKind, PropertyKey};
use crate::parser::Parser;
use crate::realm::{Realm, define_function_metadata};
use crate::value::{CheapClone, JsString, JsValue};

/// Initialize Function.prototype with call, apply, bind and the Function constructor
pub fn init_function(realm: &mut Realm) {
    let proto = realm.intrinsics.function_prototype.cheap_clone();
    define_function_metadata(&mut proto.borrow_mut(), JsString::from(""), 0);

    realm.register_method(&proto, "call", function_call, 1);
    realm.register_method(&proto, "apply", function_apply, 2);
    realm.register_method(&proto, "bind", function_bind, 1);
    realm.register_method(&proto, "toString", function_to_string, 0);

    let constructor = realm.native_constructor("Function", function_constructor_fn, 1, &proto);
    realm.define_global("Function", JsValue::Object(constructor));
}

/// Function.prototype itself: accepts any arguments and returns undefined
pub fn function_prototype_call(_interp: &mut Interpreter, _this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    Ok(JsValue::Undefined)
}

/// The Function constructor: new Function([p1[, p2[, ...pN]],] body)
///
/// The last argument is the function body, all preceding arguments are
/// parameter lists. The function closes over the global scope only.
fn function_constructor_fn(interp: &mut Interpreter, _this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let mut params = Vec::new();
    let mut body = JsString::from("");
    if let Some((last, rest)) = args.split_last() {
        for param in rest {
            params.push(interp.to_string(param)?.to_string());
        }
        body = interp.to_string(last)?;
    }
    let source = format!("(function anonymous({}\n) {{\n{}\n}})", params.join(","), body);

    let program = Parser::new(&source, &mut interp.string_dict)
        .parse_program(SourceType::Script)
        .map_err(|e| JsError::syntax_error_simple(format!("Invalid function body: {}", e)))?;
    let node = match program.body.first() {
        Some(Statement::Expression(Expression::Function(node), _)) if program.body.len() == 1 => node.cheap_clone(),
        _ => return Err(JsError::syntax_error_simple("Invalid function body")),
    };

    let env = interp.realm.global_env.cheap_clone();
    let name = Some(JsString::from("anonymous"));
    Ok(JsValue::Object(interp.instantiate_function_object(&node, &env, name)))
}

/// Function.prototype.call(thisArg, ...args)
pub fn function_call(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if !this.is_callable() {
        return Err(JsError::type_error("Function.prototype.call called on non-function"));
    }
    let this_arg = arg(args, 0);
    let call_args = args.get(1..).unwrap_or_default();
    interp.call_function(&this, this_arg, call_args)
}

/// Function.prototype.apply(thisArg, argArray)
pub fn function_apply(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    if !this.is_callable() {
        return Err(JsError::type_error("Function.prototype.apply called on non-function"));
    }
    let this_arg = arg(args, 0);
    let array_like = arg(args, 1);
    let call_args = if array_like.is_null_or_undefined() {
        Vec::new()
    } else {
        interp.create_list_from_array_like(&array_like)?
    };
    interp.call_function(&this, this_arg, &call_args)
}

/// Function.prototype.bind(thisArg, ...args)
pub fn function_bind(interp: &mut Interpreter, this: JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(target) = &this else {
        return Err(JsError::type_error("Bind must be called on a function"));
    };
    if !target.borrow().is_callable() {
        return Err(JsError::type_error("Bind must be called on a function"));
    }

    let bound_args: Vec<JsValue> = args.get(1..).unwrap_or_default().to_vec();
    let target_length = match interp.get(target, &PropertyKey::from("length"))? {
        JsValue::Number(n) if n.is_finite() => n.max(0.0).trunc(),
        JsValue::Number(n) if n == f64::INFINITY => f64::from(u32::MAX),
        _ => 0.0,
    };
    let length = (target_length - bound_args.len() as f64).max(0.0) as u32;
    let target_name = match interp.get(target, &PropertyKey::from("name"))? {
        JsValue::String(s) => s,
        _ => JsString::from(""),
    };

    let proto = target.borrow().prototype.clone();
    let mut bound = JsObject::new(
        ObjectKind::Function(JsFunction::Bound(BoundFunction {
            target: target.cheap_clone(),
            this: arg(args, 0),
            args: bound_args,
        })),
        proto,
    );
    define_function_metadata(&mut bound, JsString::from(format!("bound {}", target_name)), length);
    Ok(JsValue::Object(bound.into_ref()))
}

/// Function.prototype.toString: source text is not retained
pub fn function_to_string(_interp: &mut Interpreter, this: JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
    let JsValue::Object(obj) = &this else {
        return Err(JsError::type_error("Function.prototype.toString requires that 'this' be a Function"));
    };
    let o = obj.borrow();
    let Some(function) = o.function() else {
        return Err(JsError::type_error("Function.prototype.toString requires that 'this' be a Function"));
    };
    let name = match o.get_own_data(&PropertyKey::from("name")) {
        Some(JsValue::String(s)) => s.to_string(),
        _ => String::new(),
    };
    let text = match function {
        JsFunction::Interpreted(f) if f.node.generator => format!("function* {}() {{ [code] }}", name),
        JsFunction::Interpreted(f) if f.node.async_ => format!("async function {}() {{ [code] }}", name),
        JsFunction::Interpreted(_) => format!("function {}() {{ [code] }}", name),
        _ => format!("function {}() {{ [native code] }}", name),
    };
    Ok(JsValue::from(text))
}
