//! The step-driven evaluator
//!
//! An [`Interpreter`] owns one [`Realm`] and drives its task queues. Hosts
//! call [`Interpreter::prepare`] (or [`Interpreter::prepare_module`]) and then
//! [`Interpreter::step`] until it reports something other than
//! [`StepResult::Continue`]; [`Interpreter::run_to_completion`] does exactly
//! that in a loop.

// Builtin function implementations (split into separate files)
pub mod builtins;

pub mod budget;
mod call;
mod exec;
pub mod frame;
pub mod iteration;
mod jobs;
mod json;
pub mod module;
pub mod ops;
mod expr;
mod pattern;
pub mod reference;
mod stmt;

use std::fmt;
use std::rc::Rc;

use log::{debug, trace, warn};

use crate::ast::SourceType;
use crate::completion::Completion;
use crate::config::RuntimeConfig;
use crate::error::JsError;
use crate::object::{
    ArrayState, JsObject, JsObjectRef, NativeFn, ObjectKind, PromiseStatus, PropertyKey, PropertySlot,
    find_property,
};
use crate::parser::Parser;
use crate::realm::{ErrorKind, Realm, Task};
use crate::string_dict::StringDict;
use crate::value::{CheapClone, JsString, JsValue, number_to_string};

pub use budget::InterruptHandle;
pub use call::MAX_CALL_DEPTH;
pub use frame::ExecutionContext;
pub use module::{ModuleResolver, ModuleSource};

use budget::Budget;
use frame::{Command, ContextKind, Frame, Labels};
use jobs::{has_reactions, is_pending};
use module::ModuleRegistry;

/// What one call of [`Interpreter::step`] observed
pub enum StepResult {
    /// More work is queued; call `step` again
    Continue,
    /// All queues drained; the value of the last script or module
    Complete(JsValue),
    /// Script code waits on host promises that have not settled yet
    Suspended { pending: Vec<JsObjectRef> },
    /// All queues drained and nothing produced a value
    Done,
}

impl fmt::Debug for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResult::Continue => write!(f, "Continue"),
            StepResult::Complete(value) => write!(f, "Complete({:?})", value),
            StepResult::Suspended { pending } => write!(f, "Suspended({} pending)", pending.len()),
            StepResult::Done => write!(f, "Done"),
        }
    }
}

/// The interpreter state
pub struct Interpreter {
    pub realm: Realm,
    /// String dictionary for deduplicating identifier strings
    pub string_dict: StringDict,
    pub config: RuntimeConfig,
    pub(crate) budget: Budget,
    /// The context `step` is currently driving
    pub(crate) active: Option<Box<ExecutionContext>>,
    /// Completion value of the last script or module that finished
    main_result: Option<JsValue>,
    /// Promises created by the host and not yet settled
    host_pending: Vec<JsObjectRef>,
    /// Depth of native-to-script drive loops
    pub(crate) nesting: usize,
    /// `new.target` of the builtin currently running as a constructor
    pub(crate) native_new_target: Option<JsObjectRef>,
    pub(crate) modules: ModuleRegistry,
    pub(crate) resolver: Option<Box<dyn ModuleResolver>>,
    unhandled: Vec<JsValue>,
    pub(crate) empty_labels: Labels,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            realm: Realm::new(),
            string_dict: StringDict::with_common_strings(),
            config,
            budget: Budget::new(),
            active: None,
            main_result: None,
            host_pending: Vec::new(),
            nesting: 0,
            native_new_target: None,
            modules: ModuleRegistry::default(),
            resolver: None,
            unhandled: Vec::new(),
            empty_labels: Rc::from(Vec::<JsString>::new()),
        }
    }

    /// Handle a host thread can use to abort the running task
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.budget.interrupt_handle()
    }

    /// Charge one unit of native work to the running task.
    ///
    /// Builtins looping over caller-controlled lengths call this per element,
    /// so timeouts and interrupts land while no frame is dispatched.
    pub(crate) fn charge_native_step(&mut self) -> Result<(), JsError> {
        if let Some(reason) = self.budget.tick(&self.config) {
            debug!("aborting task inside native code: {}", reason);
            return Err(self.budget.abort_error(reason));
        }
        if let Some(reason) = self.budget.aborted()
            && !self.budget.consume_grace(&self.config)
        {
            return Err(self.budget.abort_error(reason));
        }
        Ok(())
    }

    pub fn set_module_resolver(&mut self, resolver: Box<dyn ModuleResolver>) {
        self.resolver = Some(resolver);
    }

    /// Intern a string
    pub fn intern(&mut self, s: &str) -> JsString {
        self.string_dict.get_or_insert(s)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Host driver
    // ═══════════════════════════════════════════════════════════════════════

    /// Parse a script and queue its evaluation as a macrotask
    pub fn prepare(&mut self, source: &str) -> Result<(), JsError> {
        let program = Parser::new(source, &mut self.string_dict)
            .with_strict(self.config.strict)
            .parse_program(SourceType::Script)?;
        debug!("prepared script with {} statements", program.body.len());
        self.budget.start_session();

        let env = self.realm.global_env.cheap_clone();
        let mut ctx = Box::new(ExecutionContext::new(ContextKind::Script, env, program.strict));
        ctx.push(Frame::StatementList {
            body: program.body.cheap_clone(),
            index: 0,
            last: None,
        });
        ctx.push(Frame::GlobalInstantiation(program));
        self.realm.macrotasks.push_back(Task::Evaluate(ctx));
        Ok(())
    }

    /// Perform one unit of work: one frame of the active context, or the
    /// start of the next job or macrotask
    pub fn step(&mut self) -> Result<StepResult, JsError> {
        if let Some(mut ctx) = self.active.take() {
            if ctx.frames.is_empty() {
                self.finish_active(ctx)?;
                return Ok(StepResult::Continue);
            }
            let command = match self.step_context(&mut ctx) {
                Ok(command) => command,
                Err(err) => {
                    if matches!(err, JsError::Internal(_)) {
                        self.realm.jobs.clear();
                        self.realm.macrotasks.clear();
                    }
                    return Err(err);
                }
            };
            match command {
                Command::Proceed => self.active = Some(ctx),
                Command::Await(value) => {
                    if let Some(ctx) = self.await_value(ctx, value)? {
                        self.active = Some(ctx);
                    }
                }
                Command::Yield(_) | Command::Park => {
                    return Err(JsError::internal_error("yield outside a generator"));
                }
            }
            return Ok(StepResult::Continue);
        }

        if let Some(job) = self.realm.jobs.pop_front() {
            trace!("start job ({} queued)", self.realm.jobs.len());
            self.budget.start_task();
            self.start_job(job)?;
            return Ok(StepResult::Continue);
        }
        if let Some(task) = self.realm.macrotasks.pop_front() {
            debug!("start task ({} queued)", self.realm.macrotasks.len());
            self.budget.start_task();
            self.start_task(task)?;
            return Ok(StepResult::Continue);
        }
        Ok(self.idle())
    }

    /// Step until the queues drain or script code waits on the host
    pub fn run_to_completion(&mut self) -> Result<StepResult, JsError> {
        loop {
            match self.step()? {
                StepResult::Continue => {}
                other => return Ok(other),
            }
        }
    }

    /// The active context ran out of frames
    fn finish_active(&mut self, mut ctx: Box<ExecutionContext>) -> Result<(), JsError> {
        if let Some(err) = ctx.aborting.take() {
            debug!("task aborted after {} steps", self.budget.steps());
            return Err(err);
        }
        debug!("{:?} context finished after {} steps", ctx.kind, self.budget.steps());
        match ctx.take_completion() {
            Completion::Throw(value) => Err(self.uncaught(value)),
            Completion::Normal(value) => {
                if matches!(ctx.kind, ContextKind::Script | ContextKind::Module) {
                    self.main_result = Some(value.unwrap_or_default());
                }
                Ok(())
            }
            _ => Err(JsError::internal_error("abrupt completion escaped a task")),
        }
    }

    /// Nothing is queued: report unhandled rejections and decide what the
    /// host sees
    fn idle(&mut self) -> StepResult {
        for promise in self.realm.rejections.take() {
            let reason = match &promise.borrow().kind {
                ObjectKind::Promise(state) => match &state.status {
                    PromiseStatus::Rejected(reason) if !state.handled => Some(reason.cheap_clone()),
                    _ => None,
                },
                _ => None,
            };
            if let Some(reason) = reason {
                warn!("unhandled promise rejection: {}", self.display_value(&reason));
                self.unhandled.push(reason);
            }
        }

        self.host_pending.retain(is_pending);
        let pending: Vec<JsObjectRef> = self
            .host_pending
            .iter()
            .filter(|promise| has_reactions(promise))
            .cloned()
            .collect();
        if !pending.is_empty() {
            return StepResult::Suspended { pending };
        }
        match self.main_result.take() {
            Some(value) => StepResult::Complete(value),
            None => StepResult::Done,
        }
    }

    /// Rejection reasons nobody handled, oldest first
    pub fn take_unhandled_rejections(&mut self) -> Vec<JsValue> {
        std::mem::take(&mut self.unhandled)
    }

    /// Read a global binding (lexical declarations first, then the global object)
    pub fn get_global(&mut self, name: &str) -> Result<JsValue, JsError> {
        let env = self.realm.global_env.cheap_clone();
        let name = self.intern(name);
        self.lookup_identifier(&env, &name, true)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Factories
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a new ordinary object inheriting from Object.prototype
    pub fn create_object(&mut self) -> JsObjectRef {
        JsObject::ordinary(Some(self.realm.intrinsics.object_prototype.cheap_clone())).into_ref()
    }

    /// Create a new array with the given elements
    pub fn create_array(&mut self, elements: Vec<JsValue>) -> JsObjectRef {
        let mut array = JsObject::new(
            ObjectKind::Array(ArrayState {
                length: 0,
                length_writable: true,
            }),
            Some(self.realm.intrinsics.array_prototype.cheap_clone()),
        );
        for element in elements {
            array.push_element(element);
        }
        array.into_ref()
    }

    /// Create an error object of the realm
    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> JsObjectRef {
        let proto = self.realm.intrinsics.error_prototype(kind);
        let mut error = JsObject::new(ObjectKind::Error, Some(proto));
        error.set_hidden("message", JsValue::from(message));
        error.into_ref()
    }

    pub fn create_native_function(&mut self, name: &str, func: NativeFn, arity: u32) -> JsObjectRef {
        self.realm.native_function(name, func, arity)
    }

    /// `new.target` of the builtin currently running (None for a plain call)
    pub fn new_target(&self) -> Option<JsObjectRef> {
        self.native_new_target.clone()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Errors
    // ═══════════════════════════════════════════════════════════════════════

    /// The script value a catchable error becomes when it enters script code
    pub(crate) fn error_value(&mut self, err: JsError) -> JsValue {
        let (kind, message) = match err {
            JsError::Throw(value) => return value,
            JsError::Uncaught { value, .. } => return value,
            JsError::TypeError { message } => (ErrorKind::TypeError, message),
            JsError::ReferenceError { message } => (ErrorKind::ReferenceError, message),
            JsError::RangeError { message } => (ErrorKind::RangeError, message),
            JsError::SyntaxError { message, .. } => (ErrorKind::SyntaxError, message),
            other @ (JsError::ModuleError { .. } | JsError::TaskAborted { .. } | JsError::Internal(_)) => {
                (ErrorKind::Error, other.to_string())
            }
        };
        JsValue::Object(self.create_error(kind, &message))
    }

    /// The host-facing error for a value thrown out of a task
    pub(crate) fn uncaught(&mut self, value: JsValue) -> JsError {
        let (name, message) = match &value {
            JsValue::Object(obj) => {
                let name = data_string(obj, "name").unwrap_or_else(|| "Error".to_string());
                let message = data_string(obj, "message").unwrap_or_else(|| self.display_value(&value));
                (name, message)
            }
            _ => ("Error".to_string(), self.display_value(&value)),
        };
        JsError::Uncaught { name, message, value }
    }

    /// A short human-readable rendering that never runs script code
    pub fn display_value(&self, value: &JsValue) -> String {
        match value {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => number_to_string(*n),
            JsValue::String(s) => s.to_string(),
            JsValue::Symbol(sym) => sym.descriptive_string(),
            JsValue::Object(obj) => {
                let o = obj.borrow();
                match &o.kind {
                    ObjectKind::Function(f) => format!("function {}", f.debug_name()),
                    ObjectKind::Error => {
                        let name = data_string(obj, "name").unwrap_or_else(|| "Error".to_string());
                        match data_string(obj, "message") {
                            Some(message) if !message.is_empty() => format!("{}: {}", name, message),
                            _ => name,
                        }
                    }
                    _ => format!("[object {}]", o.builtin_tag()),
                }
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// A string data property found along the prototype chain
fn data_string(obj: &JsObjectRef, name: &str) -> Option<String> {
    let prop = find_property(obj, &PropertyKey::from(name))?;
    match prop.slot {
        PropertySlot::Data {
            value: JsValue::String(s),
            ..
        } => Some(s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Result<StepResult, JsError> {
        let mut interp = Interpreter::new();
        interp.prepare(source)?;
        interp.run_to_completion()
    }

    #[test]
    fn test_step_reports_completion_value() {
        match run("1 + 2").unwrap() {
            StepResult::Complete(value) => assert_eq!(value, JsValue::Number(3.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_uncaught_error_names() {
        let err = run("throw new TypeError('bad thing')").unwrap_err();
        match err {
            JsError::Uncaught { name, message, .. } => {
                assert_eq!(name, "TypeError");
                assert_eq!(message, "bad thing");
            }
            other => panic!("unexpected {:?}", other),
        }
        let err = run("throw 42").unwrap_err();
        assert!(matches!(err, JsError::Uncaught { ref name, ref message, .. } if name == "Error" && message == "42"));
    }

    #[test]
    fn test_empty_queue_is_done() {
        let mut interp = Interpreter::new();
        assert!(matches!(interp.step().unwrap(), StepResult::Done));
    }

    #[test]
    fn test_display_value_does_not_run_code() {
        let mut interp = Interpreter::new();
        let obj = interp.create_object();
        assert_eq!(interp.display_value(&JsValue::Object(obj)), "[object Object]");
        let err = interp.create_error(ErrorKind::RangeError, "out");
        assert_eq!(interp.display_value(&JsValue::Object(err)), "RangeError: out");
    }
}
