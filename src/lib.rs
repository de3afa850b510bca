//! A step-driven ECMAScript interpreter for embedding
//!
//! Evaluation never recurses on the Rust stack for script-level control
//! flow: every script, job and suspended coroutine is an explicit stack of
//! frames that [`Interpreter::step`] advances one frame at a time. Hosts can
//! bound work per call, interleave evaluation with their own event loop, and
//! hand values back into awaiting code through host-created promises.
//!
//! # Example
//!
//! ```
//! use stepjs::{Runtime, JsValue};
//!
//! let mut runtime = Runtime::new();
//! let result = runtime.eval_simple("1 + 2 * 3").unwrap();
//! assert_eq!(result, JsValue::Number(7.0));
//! ```

pub mod ast;
pub mod completion;
pub mod config;
pub mod environment;
pub mod error;
pub mod hoist;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod realm;
pub mod string_dict;
pub mod value;

pub use completion::Completion;
pub use config::RuntimeConfig;
pub use error::JsError;
pub use interpreter::{InterruptHandle, Interpreter, ModuleResolver, ModuleSource, StepResult};
pub use object::{JsObjectRef, PropertyKey};
pub use value::{CheapClone, JsString, JsSymbol, JsValue};

/// What [`Runtime::eval`] observed once it stopped stepping
#[derive(Debug)]
pub enum RuntimeResult {
    /// All queues drained; the completion value of the script or module
    Complete(JsValue),
    /// Script code waits on promises the host has not settled yet. Settle
    /// them and call [`Runtime::resume`].
    Suspended { pending: Vec<JsObjectRef> },
}

/// An interpreter plus the run-to-completion loop most hosts want
pub struct Runtime {
    interpreter: Interpreter,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            interpreter: Interpreter::with_config(config),
        }
    }

    /// Evaluate a script and step until it completes or suspends
    pub fn eval(&mut self, source: &str) -> Result<RuntimeResult, JsError> {
        self.interpreter.prepare(source)?;
        self.resume()
    }

    /// Evaluate module source and step until it completes or suspends
    pub fn eval_module(&mut self, source: &str) -> Result<RuntimeResult, JsError> {
        self.interpreter.prepare_module(source)?;
        self.resume()
    }

    /// Continue stepping after the host settled pending promises
    pub fn resume(&mut self) -> Result<RuntimeResult, JsError> {
        match self.interpreter.run_to_completion()? {
            StepResult::Complete(value) => Ok(RuntimeResult::Complete(value)),
            StepResult::Done => Ok(RuntimeResult::Complete(JsValue::Undefined)),
            StepResult::Suspended { pending } => Ok(RuntimeResult::Suspended { pending }),
            StepResult::Continue => Err(JsError::internal_error("run_to_completion stopped early")),
        }
    }

    /// Evaluate a script that is expected to finish without host input
    pub fn eval_simple(&mut self, source: &str) -> Result<JsValue, JsError> {
        match self.eval(source)? {
            RuntimeResult::Complete(value) => Ok(value),
            RuntimeResult::Suspended { pending } => Err(JsError::type_error(format!(
                "Execution suspended on {} host promise(s) - use eval() for code awaiting the host",
                pending.len()
            ))),
        }
    }

    pub fn set_module_resolver(&mut self, resolver: Box<dyn ModuleResolver>) {
        self.interpreter.set_module_resolver(resolver);
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.interpreter.config
    }

    /// Change budgets between evaluations
    pub fn config_mut(&mut self) -> &mut RuntimeConfig {
        &mut self.interpreter.config
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Convert a JSON document into a script value of this runtime
    pub fn value_from_json(&mut self, json: &serde_json::Value) -> JsValue {
        self.interpreter.value_from_json(json)
    }

    pub fn value_to_json(&self, value: &JsValue) -> Result<serde_json::Value, JsError> {
        self.interpreter.value_to_json(value)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        let mut runtime = Runtime::new();
        let result = runtime.eval_simple("1 + 2 * 3").unwrap();
        assert_eq!(result, JsValue::Number(7.0));
    }

    #[test]
    fn test_eval_simple_rejects_suspension() {
        let mut runtime = Runtime::new();
        let promise = runtime.interpreter_mut().create_pending_promise();
        runtime
            .interpreter_mut()
            .realm
            .define_global("hostValue", JsValue::Object(promise));
        let err = runtime.eval_simple("(async () => await hostValue)()").unwrap_err();
        assert!(err.to_string().contains("suspended"));
    }

    #[test]
    fn test_resume_after_host_settles() {
        let mut runtime = Runtime::new();
        let promise = runtime.interpreter_mut().create_pending_promise();
        runtime
            .interpreter_mut()
            .realm
            .define_global("hostValue", JsValue::Object(promise.cheap_clone()));
        let result = runtime
            .eval("var out; (async () => { out = await hostValue; })(); 'started'")
            .unwrap();
        assert!(matches!(result, RuntimeResult::Suspended { .. }));

        runtime
            .interpreter_mut()
            .resolve_promise(&promise, JsValue::Number(42.0))
            .unwrap();
        assert!(matches!(runtime.resume().unwrap(), RuntimeResult::Complete(_)));
        assert_eq!(runtime.interpreter_mut().get_global("out").unwrap(), JsValue::Number(42.0));
    }

    #[test]
    fn test_config_round_trips_through_runtime() {
        let runtime = Runtime::with_config(RuntimeConfig::default().with_max_steps(100));
        assert_eq!(runtime.config().max_steps_per_task, 100);
    }
}
