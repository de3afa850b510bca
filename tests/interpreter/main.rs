//! Integration tests for the interpreter, organized by feature
//!
//! These tests exercise the interpreter through the public API: `prepare`
//! followed by a `step` loop, exactly as an embedding host drives it.

mod array;
mod async_await;
mod basics;
mod control_flow;
mod error;
mod function;
mod generator;
mod map_set;
mod modules;
mod object;
mod promise;
mod step;
mod string_number;
mod symbol;

use stepjs::{Interpreter, JsError, JsValue, StepResult};

/// Run an interpreter to completion using the step-based API.
/// Returns the final StepResult (Complete, Done or Suspended).
pub fn run_to_completion(interp: &mut Interpreter) -> Result<StepResult, JsError> {
    loop {
        match interp.step()? {
            StepResult::Continue => continue,
            result => return Ok(result),
        }
    }
}

/// Evaluate a script and return its completion value
#[allow(clippy::expect_used)]
pub fn eval(source: &str) -> JsValue {
    eval_result(source).expect("eval failed")
}

/// Evaluate a script, returning the error instead of panicking
pub fn eval_result(source: &str) -> Result<JsValue, JsError> {
    let mut interp = Interpreter::new();
    interp.prepare(source)?;
    match run_to_completion(&mut interp)? {
        StepResult::Complete(value) => Ok(value),
        StepResult::Done => Ok(JsValue::Undefined),
        StepResult::Suspended { pending } => Err(JsError::type_error(format!(
            "Test suspended waiting for {} host promises",
            pending.len()
        ))),
        StepResult::Continue => Err(JsError::internal_error("Unexpected Continue from run_to_completion")),
    }
}

/// Evaluate a script, then read a global it assigned. Lets tests observe
/// values produced by jobs that run after the script itself.
#[allow(clippy::expect_used)]
pub fn eval_global(source: &str, name: &str) -> JsValue {
    let mut interp = Interpreter::new();
    interp.prepare(source).expect("prepare failed");
    run_to_completion(&mut interp).expect("run failed");
    interp.get_global(name).expect("global lookup failed")
}

/// Check that evaluation fails with an error whose message contains `error_contains`
pub fn throws_error(source: &str, error_contains: &str) -> bool {
    match eval_result(source) {
        Err(e) => e.to_string().contains(error_contains),
        Ok(_) => false,
    }
}

/// A string value, for terser assertions
pub fn s(text: &str) -> JsValue {
    JsValue::from(text)
}
