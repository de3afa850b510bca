//! Error objects and runtime-raised exceptions

use super::{eval, eval_result, s, throws_error};
use stepjs::{JsError, JsValue};

#[test]
fn test_error_kinds_and_instanceof() {
    for kind in ["Error", "TypeError", "ReferenceError", "RangeError", "SyntaxError", "EvalError", "URIError"] {
        let source = format!(
            "const e = new {kind}('m'); [e instanceof {kind}, e instanceof Error, e.name, e.message].join()"
        );
        assert_eq!(eval(&source), s(&format!("true,true,{kind},m")), "{}", kind);
    }
}

#[test]
fn test_native_error_constructor_inherits_from_error() {
    assert_eq!(eval("Object.getPrototypeOf(TypeError) === Error"), JsValue::Boolean(true));
    assert_eq!(eval("Object.getPrototypeOf(TypeError.prototype) === Error.prototype"), JsValue::Boolean(true));
}

#[test]
fn test_error_called_without_new() {
    assert_eq!(eval("const e = RangeError('r'); e instanceof RangeError && e.message === 'r'"), JsValue::Boolean(true));
}

#[test]
fn test_message_is_own_only_when_given() {
    assert_eq!(eval("new Error().hasOwnProperty('message')"), JsValue::Boolean(false));
    assert_eq!(eval("new Error(undefined).message"), s(""));
    assert_eq!(eval("new Error(42).message"), s("42"));
    assert_eq!(eval("new Error('x').propertyIsEnumerable('message')"), JsValue::Boolean(false));
}

#[test]
fn test_error_to_string() {
    assert_eq!(eval("String(new TypeError('bad'))"), s("TypeError: bad"));
    assert_eq!(eval("String(new Error())"), s("Error"));
    assert_eq!(eval("const e = new Error('m'); e.name = ''; String(e)"), s("m"));
    assert_eq!(eval("Error.prototype.toString.call({ name: 'Custom', message: 'c' })"), s("Custom: c"));
}

#[test]
fn test_error_cause() {
    assert_eq!(eval("new Error('outer', { cause: 'inner' }).cause"), s("inner"));
    assert_eq!(eval("new Error('outer', {}).hasOwnProperty('cause')"), JsValue::Boolean(false));
    assert_eq!(eval("new Error('outer', { cause: undefined }).hasOwnProperty('cause')"), JsValue::Boolean(true));
}

#[test]
fn test_engine_errors_are_catchable_objects() {
    assert_eq!(eval("try { undefinedName; } catch (e) { e instanceof ReferenceError }"), JsValue::Boolean(true));
    assert_eq!(eval("try { (1)(); } catch (e) { e.constructor === TypeError }"), JsValue::Boolean(true));
    assert_eq!(eval("try { 'x'.repeat(-1); } catch (e) { e.name }"), s("RangeError"));
}

#[test]
fn test_syntax_error_at_prepare() {
    let err = eval_result("let = ;").unwrap_err();
    assert!(matches!(err, JsError::SyntaxError { .. }), "{}", err);
    let err = eval_result("let a = 1; let a = 2;").unwrap_err();
    assert!(err.to_string().contains("SyntaxError"), "{}", err);
}

#[test]
fn test_uncaught_error_carries_value() {
    let err = eval_result("throw { code: 7 }").unwrap_err();
    match err {
        JsError::Uncaught { value: JsValue::Object(obj), .. } => {
            assert_eq!(obj.borrow().get_own_data(&"code".into()), Some(JsValue::Number(7.0)));
        }
        other => panic!("expected Uncaught object, got {}", other),
    }
}

#[test]
fn test_rethrow_preserves_identity() {
    assert_eq!(
        eval("const original = new Error('x'); let caught; try { try { throw original; } catch (e) { throw e; } } catch (e) { caught = e; } caught === original"),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_custom_error_subclass_via_prototype() {
    assert!(throws_error(
        r#"
        function ValidationError(message) { this.message = message; }
        ValidationError.prototype = Object.create(Error.prototype);
        ValidationError.prototype.name = 'ValidationError';
        throw new ValidationError('field missing');
        "#,
        "ValidationError: field missing"
    ));
}
